//! Dependency resolution
//!
//! Walks the declared dependencies of a set of root packages against the
//! installed packages and a priority-ordered repository list, producing the
//! transitively closed set of packages, the subset that is not installed
//! yet, and the constraints nothing could satisfy.
//!
//! For each dependency edge the resolver tries, in order:
//!
//! 1. a package already chosen for that name,
//! 2. a version pinned by an earlier pass,
//! 3. the installed package,
//! 4. the best repository candidate that keeps installed packages intact,
//! 5. the best repository candidate without that restriction (with a
//!    warning that installed packages may need upgrading).
//!
//! When a later edge forces a different version of a name that was already
//! chosen, the replacement is pinned and the walk starts over from the
//! roots, so nothing pulled in by the replaced version survives.
//!
//! Anything left over is reported as unknown. Resolution never fails.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use plinth_core::{
    PackageDefinition, PackageDependency, PackageIdentity, PackageSpecifier, VersionSpecifier,
};
use plinth_registry::RepositoryIndex;
use tracing::{debug, warn};

use crate::semver::VersionSelector;

/// A declared constraint nothing could satisfy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownDependency {
    pub name: String,
    pub version: VersionSpecifier,
}

impl fmt::Display for UnknownDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Outcome of one resolve call
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Every resolved package, roots included, one per name
    pub dependencies: Vec<PackageDefinition>,
    /// Resolved packages whose exact identity is not installed
    pub missing_dependencies: Vec<PackageDefinition>,
    /// Constraints that could not be satisfied anywhere
    pub unknown_dependencies: Vec<UnknownDependency>,
}

impl ResolutionResult {
    /// True when nothing is unknown
    pub fn is_complete(&self) -> bool {
        self.unknown_dependencies.is_empty()
    }

    /// Resolved package called `name`
    pub fn get(&self, name: &str) -> Option<&PackageDefinition> {
        self.dependencies.iter().find(|def| def.name() == name)
    }

    /// Render the unknown constraints as `name constraint, ...`
    pub fn describe_unknown(&self) -> String {
        self.unknown_dependencies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Resolver scoped to a single resolve call
#[derive(Debug)]
pub struct DependencyResolver<'a> {
    installed: &'a HashMap<String, PackageDefinition>,
    roots: Vec<PackageDefinition>,
    selector: VersionSelector<'a>,
}

/// Mutable walk state
#[derive(Default)]
struct Walk {
    chosen: IndexMap<String, PackageDefinition>,
    root_names: HashSet<String>,
    queue: VecDeque<String>,
    /// Constraints on each name, tagged with the dependent that declared them
    constraints: HashMap<String, Vec<(PackageIdentity, VersionSpecifier)>>,
    seen_edges: HashSet<(PackageIdentity, PackageDependency)>,
    unknown: Vec<UnknownDependency>,
    /// Replacement that invalidates this pass
    repin: Option<PackageDefinition>,
}

/// Versions forced by earlier passes, kept across restarts
#[derive(Default)]
struct Pins {
    chosen: HashMap<String, PackageDefinition>,
    tried: HashSet<PackageIdentity>,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver for `roots` against installed packages and repositories
    pub fn new<I>(
        installed: &'a HashMap<String, PackageDefinition>,
        roots: Vec<PackageDefinition>,
        repositories: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryIndex>,
    {
        Self {
            installed,
            roots,
            selector: VersionSelector::new(repositories),
        }
    }

    /// Resolve the transitive closure of the roots
    pub fn resolve(self) -> ResolutionResult {
        let mut pins = Pins::default();
        let walk = loop {
            let mut walk = self.walk(&pins);
            match walk.repin.take() {
                Some(definition) => {
                    debug!(package = %definition.identity, "pinned replacement, restarting walk");
                    pins.tried.insert(definition.identity.clone());
                    pins.chosen.insert(definition.name().to_string(), definition);
                },
                None => break walk,
            }
        };

        let missing_dependencies = walk
            .chosen
            .values()
            .filter(|def| {
                self.installed
                    .get(def.name())
                    .map_or(true, |installed| installed.identity != def.identity)
            })
            .cloned()
            .collect();

        ResolutionResult {
            dependencies: walk.chosen.into_values().collect(),
            missing_dependencies,
            unknown_dependencies: walk.unknown,
        }
    }

    /// One breadth-first pass from the roots; stops early on a repin
    fn walk(&self, pins: &Pins) -> Walk {
        let mut walk = Walk::default();

        for root in &self.roots {
            if walk.chosen.contains_key(root.name()) {
                warn!(package = %root.identity, "duplicate root ignored");
                continue;
            }
            walk.root_names.insert(root.name().to_string());
            walk.chosen.insert(root.name().to_string(), root.clone());
            walk.queue.push_back(root.name().to_string());
        }

        while let Some(name) = walk.queue.pop_front() {
            let Some(dependent) = walk.chosen.get(&name).cloned() else {
                continue;
            };
            for dependency in &dependent.dependencies {
                let edge = (dependent.identity.clone(), dependency.clone());
                if walk.seen_edges.insert(edge) {
                    self.resolve_edge(&mut walk, pins, &dependent, dependency);
                }
                if walk.repin.is_some() {
                    return walk;
                }
            }
        }

        walk
    }

    fn resolve_edge(
        &self,
        walk: &mut Walk,
        pins: &Pins,
        dependent: &PackageDefinition,
        dependency: &PackageDependency,
    ) {
        let name = dependency.name.as_str();
        let constraint = &dependency.version;
        walk.constraints
            .entry(name.to_string())
            .or_default()
            .push((dependent.identity.clone(), constraint.clone()));

        let query = PackageSpecifier::named(name)
            .with_version(constraint.clone())
            .with_architecture(dependent.identity.architecture)
            .with_os(dependent.identity.os.clone());

        // 1. already satisfied
        if let Some(existing) = walk.chosen.get(name) {
            if constraint.is_compatible(existing.version())
                && existing
                    .identity
                    .architecture
                    .is_compatible_with(query.architecture)
            {
                debug!(dependency = %dependency, by = %existing.identity, "already satisfied");
                return;
            }
            self.reconcile(walk, pins, dependent, dependency, &query);
            return;
        }

        // 2. pinned by an earlier pass
        if let Some(pinned) = pins.chosen.get(name) {
            if query.matches(&pinned.identity) {
                debug!(dependency = %dependency, by = %pinned.identity, "using pinned package");
                self.choose(walk, pinned.clone());
                return;
            }
        }

        // 3. installed
        if let Some(installed) = self.installed.get(name) {
            if query.matches(&installed.identity) {
                debug!(dependency = %dependency, by = %installed.identity, "using installed package");
                self.choose(walk, installed.clone());
                return;
            }
        }

        // 4. repositories, keeping installed packages intact
        let untouched = self.untouched_installed(walk);
        if let Some(candidate) = self.selector.select_best(&query, &[], &untouched) {
            debug!(dependency = %dependency, by = %candidate.identity, "found in repository");
            self.choose(walk, candidate);
            return;
        }

        // 5. repositories, unrestricted
        if let Some(candidate) = self.selector.select_best(&query, &[], &[]) {
            warn!(
                dependency = %dependency,
                candidate = %candidate.identity,
                required_by = %dependent.identity,
                "completing the install may require upgrading installed packages"
            );
            self.choose(walk, candidate);
            return;
        }

        // 6. unknown
        self.record_unknown(walk, dependent, dependency);
    }

    /// Handle an edge whose name is already chosen at an incompatible
    /// version: find one version satisfying every live constraint on that
    /// name and pin it for the next pass, or report the edge as unknown.
    /// A replacement pinned before is swapped in place instead.
    fn reconcile(
        &self,
        walk: &mut Walk,
        pins: &Pins,
        dependent: &PackageDefinition,
        dependency: &PackageDependency,
        query: &PackageSpecifier,
    ) {
        let name = dependency.name.as_str();
        if walk.root_names.contains(name) {
            self.record_unknown(walk, dependent, dependency);
            return;
        }

        let live: Vec<VersionSpecifier> = walk
            .constraints
            .get(name)
            .into_iter()
            .flatten()
            .filter(|(declarer, _)| {
                walk.chosen
                    .get(&declarer.name)
                    .map_or(false, |chosen| chosen.identity == *declarer)
            })
            .map(|(_, spec)| spec.clone())
            .collect();

        let installed = self
            .installed
            .get(name)
            .filter(|def| query.matches(&def.identity))
            .filter(|def| live.iter().all(|spec| spec.is_compatible(def.version())))
            .cloned();

        let replacement = installed.or_else(|| {
            let untouched = self.untouched_installed(walk);
            self.selector
                .select_best(query, &live, &untouched)
                .or_else(|| self.selector.select_best(query, &live, &[]))
        });

        match replacement {
            Some(candidate) if !pins.tried.contains(&candidate.identity) => {
                debug!(
                    package = name,
                    replacement = %candidate.identity,
                    "replacing earlier choice to satisfy all constraints"
                );
                walk.repin = Some(candidate);
            },
            Some(candidate) => {
                warn!(
                    package = name,
                    replacement = %candidate.identity,
                    "replacement already pinned, swapping in place"
                );
                self.choose(walk, candidate);
            },
            None => self.record_unknown(walk, dependent, dependency),
        }
    }

    fn choose(&self, walk: &mut Walk, definition: PackageDefinition) {
        let name = definition.name().to_string();
        walk.chosen.insert(name.clone(), definition);
        walk.queue.push_back(name);
    }

    fn record_unknown(
        &self,
        walk: &mut Walk,
        dependent: &PackageDefinition,
        dependency: &PackageDependency,
    ) {
        let unknown = UnknownDependency {
            name: dependency.name.clone(),
            version: dependency.version.clone(),
        };
        debug!(dependency = %unknown, required_by = %dependent.identity, "unresolved");
        if !walk.unknown.contains(&unknown) {
            walk.unknown.push(unknown);
        }
    }

    /// Installed packages that this resolution is not replacing
    fn untouched_installed(&self, walk: &Walk) -> Vec<PackageDefinition> {
        self.installed
            .values()
            .filter(|installed| {
                walk.chosen
                    .get(installed.name())
                    .map_or(true, |chosen| chosen.identity == installed.identity)
            })
            .cloned()
            .collect()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Random dependency graphs over a small name pool always terminate
        // with at most one entry per name.
        #[test]
        fn resolution_has_one_entry_per_name(
            edges in prop::collection::vec((0usize..6, 0usize..6, 0u64..3), 0..20),
        ) {
            let mut packages: Vec<PackageDefinition> = (0..6)
                .flat_map(|i| {
                    (0..3).map(move |minor| {
                        PackageDefinition::parse(&format!("P{}", i), &format!("1.{}.0", minor)).unwrap()
                    })
                })
                .collect();
            for (from, to, minor) in edges {
                let spec = VersionSpecifier::parse(&format!("^1.{}", minor)).unwrap();
                for pkg in packages.iter_mut().filter(|p| p.name() == format!("P{}", from)) {
                    pkg.dependencies.push(PackageDependency::new(format!("P{}", to), spec.clone()));
                }
            }
            let root = packages[0].clone();
            let repos = vec![RepositoryIndex::new("r", packages)];
            let installed = HashMap::new();

            let result = DependencyResolver::new(&installed, vec![root], &repos).resolve();

            let mut seen = HashSet::new();
            for def in &result.dependencies {
                prop_assert!(seen.insert(def.name().to_string()));
            }
        }
    }
}

//! Candidate selection across repositories
//!
//! Picks the best package definition for a query from a priority-ordered
//! list of repository indexes: the highest matching version wins, and on a
//! version tie the earlier repository wins.

use std::cmp::Ordering;

use plinth_core::{PackageDefinition, PackageSpecifier, SemanticVersion, VersionSpecifier};
use plinth_registry::RepositoryIndex;

/// Version selector over a priority-ordered repository list
#[derive(Debug, Clone)]
pub struct VersionSelector<'a> {
    /// Repositories, highest priority first
    repositories: Vec<&'a RepositoryIndex>,
}

impl<'a> VersionSelector<'a> {
    /// Create new version selector over `repositories`
    pub fn new<I>(repositories: I) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryIndex>,
    {
        Self {
            repositories: repositories.into_iter().collect(),
        }
    }

    /// Select the best definition matching `query` and every extra constraint.
    ///
    /// `compatible_with` restricts candidates to those that keep that set of
    /// packages consistent; pass an empty slice for an unrestricted search.
    pub fn select_best(
        &self,
        query: &PackageSpecifier,
        constraints: &[VersionSpecifier],
        compatible_with: &[PackageDefinition],
    ) -> Option<PackageDefinition> {
        let mut best: Option<PackageDefinition> = None;

        for repository in &self.repositories {
            for candidate in repository.get_packages(query, compatible_with) {
                if !constraints.iter().all(|c| c.is_compatible(candidate.version())) {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some(current) => rank(query, &candidate, current) == Ordering::Greater,
                };
                if better {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Highest version among definitions matching `query` that `accept` keeps
    pub fn select_version<F>(&self, query: &PackageSpecifier, accept: F) -> Option<SemanticVersion>
    where
        F: Fn(&PackageDefinition) -> bool,
    {
        self.repositories
            .iter()
            .flat_map(|repository| repository.get_packages(query, &[]))
            .filter(|candidate| accept(candidate))
            .map(|candidate| candidate.identity.version)
            .max_by(|a, b| a.precedence_cmp(b))
    }
}

/// Order two candidates: version precedence first, then an exact
/// architecture match over a neutral one.
fn rank(query: &PackageSpecifier, a: &PackageDefinition, b: &PackageDefinition) -> Ordering {
    let exact_arch = |def: &PackageDefinition| {
        !query.architecture.is_neutral() && def.identity.architecture == query.architecture
    };
    a.version()
        .precedence_cmp(b.version())
        .then_with(|| exact_arch(a).cmp(&exact_arch(b)))
}

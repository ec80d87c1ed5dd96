//! File-ownership conflict detection
//!
//! A candidate conflicts with an installed package when it would place a
//! file that the installed package owns and the two are not the same
//! package. Upgrading a package to another version of the same name never
//! conflicts.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use plinth_core::utils::file_key;
use plinth_core::{PackageDefinition, PackageIdentity};

/// One file claimed by two differently named packages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileConflict {
    /// Path as declared by the incoming package
    pub path: String,
    /// Installed package that owns the file now
    pub owner: PackageIdentity,
    /// Incoming package that would overwrite it
    pub offender: PackageIdentity,
}

impl fmt::Display for FileConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (owned by {})", self.path, self.owner)
    }
}

/// Compares file ownership between installed and incoming packages
#[derive(Debug)]
pub struct ConflictDetector<'a> {
    installed: Vec<&'a PackageDefinition>,
    candidates: &'a [PackageDefinition],
}

impl<'a> ConflictDetector<'a> {
    pub fn new<I>(installed: I, candidates: &'a [PackageDefinition]) -> Self
    where
        I: IntoIterator<Item = &'a PackageDefinition>,
    {
        Self {
            installed: installed.into_iter().collect(),
            candidates,
        }
    }

    /// List every conflict, in candidate and file order
    pub fn detect(&self) -> Vec<FileConflict> {
        let mut owners: HashMap<String, Vec<&PackageDefinition>> = HashMap::new();
        for package in self.installed.iter().copied() {
            for file in &package.files {
                owners
                    .entry(file_key(&file.path))
                    .or_default()
                    .push(package);
            }
        }

        let mut conflicts = Vec::new();
        let mut seen = HashSet::new();
        for candidate in self.candidates {
            for file in &candidate.files {
                let key = file_key(&file.path);
                let Some(current) = owners.get(&key) else {
                    continue;
                };
                for owner in current {
                    if owner.name() == candidate.name() {
                        continue;
                    }
                    if seen.insert((key.clone(), &owner.identity, &candidate.identity)) {
                        conflicts.push(FileConflict {
                            path: file.path.clone(),
                            owner: owner.identity.clone(),
                            offender: candidate.identity.clone(),
                        });
                    }
                }
            }
        }
        conflicts
    }
}

/// Group conflicts by the incoming package, keeping first-seen order
pub fn group_by_offender(conflicts: &[FileConflict]) -> IndexMap<PackageIdentity, Vec<&FileConflict>> {
    let mut grouped: IndexMap<PackageIdentity, Vec<&FileConflict>> = IndexMap::new();
    for conflict in conflicts {
        grouped
            .entry(conflict.offender.clone())
            .or_default()
            .push(conflict);
    }
    grouped
}

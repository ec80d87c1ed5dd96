//! Common utilities for benchmarks

use std::time::Duration;

use criterion::Criterion;
use plinth_core::{PackageDefinition, VersionSpecifier};
use plinth_registry::RepositoryIndex;

/// Criterion settings shared by every bench
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(5))
        .sample_size(50)
}

/// Package `P<index>` at `version`
pub fn package(index: usize, version: &str) -> PackageDefinition {
    PackageDefinition::parse(&format!("P{}", index), version)
        .unwrap_or_else(|e| panic!("bad fixture version {}: {}", version, e))
}

/// A layered dependency graph spread over `repositories` indexes.
///
/// Package `i` depends on up to `fan_out` packages with higher indexes, and
/// every package is published in three minor versions so that selection
/// has real choices to make.
pub fn layered_repositories(packages: usize, fan_out: usize, repositories: usize) -> Vec<RepositoryIndex> {
    let compatible = VersionSpecifier::parse("^1.0").unwrap_or(VersionSpecifier::ANY);
    let mut per_repository: Vec<Vec<PackageDefinition>> = vec![Vec::new(); repositories.max(1)];

    for index in 0..packages {
        for minor in 0..3 {
            let mut definition = package(index, &format!("1.{}.0", minor));
            for offset in 1..=fan_out {
                let dependency = index + offset * 3;
                if dependency < packages {
                    definition = definition.with_dependency(format!("P{}", dependency), compatible.clone());
                }
            }
            per_repository[(index + minor) % repositories.max(1)].push(definition);
        }
    }

    per_repository
        .into_iter()
        .enumerate()
        .map(|(position, packages)| RepositoryIndex::new(format!("bench-{}", position), packages))
        .collect()
}

/// `count` packages that each declare `files_per_package` files, with
/// every tenth file shared with the next package
pub fn packages_with_files(count: usize, files_per_package: usize) -> Vec<PackageDefinition> {
    (0..count)
        .map(|index| {
            (0..files_per_package).fold(package(index, "1.0.0"), |definition, file| {
                if file % 10 == 0 {
                    definition.with_file(format!("shared/{}-{}.dat", index + 1, file))
                } else {
                    definition.with_file(format!("pkg{}/file{}.dat", index, file))
                }
            })
        })
        .collect()
}

/// First definition of `P0` in `repositories`, the root of the layered graph
pub fn layered_root(repositories: &[RepositoryIndex]) -> PackageDefinition {
    repositories
        .iter()
        .flat_map(|index| index.packages())
        .find(|definition| definition.name() == "P0")
        .cloned()
        .unwrap_or_else(|| package(0, "1.0.0"))
}

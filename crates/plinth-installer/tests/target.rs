//! Full workflows against a directory repository and an on-disk target

use std::path::Path;
use std::sync::Arc;

use plinth_cache::{package_archive_bytes, InstallTarget};
use plinth_core::utils::blake3_hash;
use plinth_core::{PackageDefinition, PlinthError, VersionSpecifier};
use plinth_installer::{InstallationOrchestrator, PackageRequest};
use plinth_registry::{FileRepository, IndexDocument, Repository, INDEX_FILE_NAME};
use tempfile::TempDir;

fn def(name: &str, version: &str) -> PackageDefinition {
    PackageDefinition::parse(name, version).unwrap()
}

/// Write an archive per package plus an `index.json` listing them
fn write_repository(dir: &Path, packages: Vec<(PackageDefinition, Vec<(&str, &[u8])>)>) {
    let mut listed = Vec::new();
    for (definition, files) in packages {
        let archive = package_archive_bytes(&definition, &files).unwrap();
        let file_name = format!("{}-{}.tar.gz", definition.name(), definition.version());
        std::fs::write(dir.join(&file_name), &archive).unwrap();

        let mut definition = definition.with_artifact(file_name);
        definition.checksum = Some(blake3_hash(&archive));
        listed.push(definition);
    }
    let document = IndexDocument::new(listed);
    std::fs::write(
        dir.join(INDEX_FILE_NAME),
        serde_json::to_vec_pretty(&document).unwrap(),
    )
    .unwrap();
}

fn orchestrator(repository: &TempDir, target: &InstallTarget) -> InstallationOrchestrator {
    let repository: Arc<dyn Repository> = Arc::new(FileRepository::new("local", repository.path()));
    InstallationOrchestrator::new(vec![repository], Arc::new(target.clone()))
}

fn app_and_lib(dir: &Path) {
    let app_files: Vec<(&str, &[u8])> = vec![("bin/app", b"app binary".as_slice())];
    let lib_files: Vec<(&str, &[u8])> = vec![
        ("lib/libcore.so", b"core library".as_slice()),
        ("share/core/README", b"docs".as_slice()),
    ];
    write_repository(
        dir,
        vec![
            (
                def("App", "1.0.0").with_dependency("Lib", VersionSpecifier::parse("^1").unwrap()),
                app_files,
            ),
            (def("Lib", "1.2.0"), lib_files),
        ],
    );
}

#[tokio::test]
async fn test_install_then_uninstall() {
    let repository = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    app_and_lib(repository.path());
    let target = InstallTarget::new(root.path());

    let report = orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("App", VersionSpecifier::ANY)])
        .await
        .unwrap();

    assert_eq!(report.installed.len(), 2);
    assert_eq!(report.installed[0].name, "Lib");
    assert_eq!(
        std::fs::read_to_string(root.path().join("bin/app")).unwrap(),
        "app binary"
    );
    assert!(root.path().join("lib/libcore.so").is_file());

    let installed = target.installed().unwrap();
    assert_eq!(installed.len(), 2);
    assert_eq!(installed["Lib"].files.len(), 2);
    assert!(lock_released(&target));

    orchestrator(&repository, &target)
        .uninstall(vec!["App".to_string(), "Lib".to_string()])
        .await
        .unwrap();

    assert!(target.installed().unwrap().is_empty());
    assert!(!root.path().join("bin/app").exists());
    assert!(!root.path().join("share/core").exists());
}

fn lock_released(target: &InstallTarget) -> bool {
    plinth_cache::InstallLock::try_acquire(target.lock_path())
        .unwrap()
        .is_some()
}

#[tokio::test]
async fn test_reinstall_is_nothing_to_do() {
    let repository = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    app_and_lib(repository.path());
    let target = InstallTarget::new(root.path());

    orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("Lib", VersionSpecifier::ANY)])
        .await
        .unwrap();
    let report = orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("Lib", VersionSpecifier::ANY)])
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn test_corrupt_archive_fails_download() {
    let repository = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    app_and_lib(repository.path());
    std::fs::write(repository.path().join("Lib-1.2.0.tar.gz"), b"truncated").unwrap();
    let target = InstallTarget::new(root.path());

    let err = orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("App", VersionSpecifier::ANY)])
        .await
        .unwrap_err();

    assert!(matches!(err, PlinthError::DownloadFailure { .. }));
    assert_eq!(err.exit_code(), 6);
    assert!(target.installed().unwrap().is_empty());
    assert!(!root.path().join("bin/app").exists());
}

#[tokio::test]
async fn test_file_owned_by_other_package_blocks_install() {
    let repository = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let tool: Vec<(&str, &[u8])> = vec![("bin/tool", b"one".as_slice())];
    let rival: Vec<(&str, &[u8])> = vec![("bin/tool", b"two".as_slice())];
    write_repository(
        repository.path(),
        vec![
            (def("Tool", "1.0.0").with_file("bin/tool"), tool),
            (def("Rival", "1.0.0").with_file("bin/tool"), rival),
        ],
    );
    let target = InstallTarget::new(root.path());

    orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("Tool", VersionSpecifier::ANY)])
        .await
        .unwrap();
    let err = orchestrator(&repository, &target)
        .install(vec![PackageRequest::named("Rival", VersionSpecifier::ANY)])
        .await
        .unwrap_err();

    assert!(matches!(err, PlinthError::FileOverwriteConflict { count: 1, .. }));
    assert_eq!(std::fs::read_to_string(root.path().join("bin/tool")).unwrap(), "one");
}

//! Unit tests for the HTTP repository

use super::*;

use plinth_core::utils::blake3_hash;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_base_url_gets_trailing_slash() {
    let repo = HttpRepository::new("https://example.com/plugins", RetryConfig::default()).unwrap();
    assert_eq!(repo.base_url.as_str(), "https://example.com/plugins/");
    assert_eq!(
        repo.url_for("index.json").unwrap().as_str(),
        "https://example.com/plugins/index.json"
    );
}

#[tokio::test]
async fn test_invalid_url() {
    let result = HttpRepository::new("http://[bad", RetryConfig::default());
    assert!(matches!(result, Err(PlinthError::ConfigValidation { .. })));
}

#[tokio::test]
async fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.initial_delay, Duration::from_millis(100));
    assert_eq!(config.max_delay, Duration::from_secs(10));
    assert_eq!(config.multiplier, 2.0);
}

#[tokio::test]
async fn test_load_index_success() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "formatVersion": 1,
        "packages": [
            { "name": "Core", "version": "1.0.0", "artifact": "core-1.0.0.tar.gz" },
            {
                "name": "Viewer",
                "version": "2.1.0",
                "dependencies": [{ "name": "Core", "version": "^1.0" }]
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/repo/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let location = format!("{}/repo", mock_server.uri());
    let repo = HttpRepository::new(location.clone(), fast_retry()).unwrap();
    let index = repo.load_index().await.unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.location(), location);
    assert_eq!(index.get_package_versions("Viewer", &[]).len(), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repo = HttpRepository::new(mock_server.uri(), fast_retry()).unwrap();
    let result = repo.load_index().await;
    assert!(matches!(result, Err(PlinthError::DownloadFailure { .. })));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let repo = HttpRepository::new(mock_server.uri(), fast_retry()).unwrap();
    let result = repo.load_index().await;
    assert!(matches!(result, Err(PlinthError::Network { .. })));
}

#[tokio::test]
async fn test_download_package() {
    let mock_server = MockServer::start().await;
    let archive = b"fake archive".to_vec();

    Mock::given(method("GET"))
        .and(path("/pkgs/core-1.0.0.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .mount(&mock_server)
        .await;

    let repo = HttpRepository::new(mock_server.uri(), fast_retry()).unwrap();
    let mut def = PackageDefinition::parse("Core", "1.0.0")
        .unwrap()
        .with_artifact("pkgs/core-1.0.0.tar.gz");
    def.checksum = Some(blake3_hash(&archive));

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("downloads/core.tar.gz");
    repo.download_package(&def, &destination).await.unwrap();
    assert_eq!(std::fs::read(&destination).unwrap(), archive);
}

#[tokio::test]
async fn test_download_integrity_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/core.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
        .mount(&mock_server)
        .await;

    let repo = HttpRepository::new(mock_server.uri(), fast_retry()).unwrap();
    let mut def = PackageDefinition::parse("Core", "1.0.0")
        .unwrap()
        .with_artifact("core.tar.gz");
    def.checksum = Some(blake3_hash(b"original"));

    let dir = tempfile::tempdir().unwrap();
    let result = repo.download_package(&def, &dir.path().join("core.tar.gz")).await;
    assert!(matches!(result, Err(PlinthError::IntegrityFailure { .. })));
    assert!(!dir.path().join("core.tar.gz").exists());
}

#[tokio::test]
async fn test_download_without_artifact() {
    let repo = HttpRepository::new("http://localhost:9", fast_retry()).unwrap();
    let def = PackageDefinition::parse("Core", "1.0.0").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = repo.download_package(&def, &dir.path().join("x")).await;
    assert!(matches!(result, Err(PlinthError::DownloadFailure { .. })));
}

//! HTTP repository implementation with connection pooling and retry logic

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use url::Url;

use plinth_core::utils::verify_integrity;
use plinth_core::{PackageDefinition, PlinthError};

use crate::api::INDEX_FILE_NAME;
use crate::index::RepositoryIndex;
use crate::source::Repository;
use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Repository served over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpRepository {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Location as configured
    location: String,
    /// Base URL, always ending in '/'
    base_url: Url,
}

impl HttpRepository {
    /// Create a repository client for `location`
    pub fn new(location: impl Into<String>, retry_config: RetryConfig) -> RegistryResult<Self> {
        let location = location.into();
        let mut base = location.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| PlinthError::ConfigValidation {
            field: "repository".to_string(),
            reason: format!("invalid URL {}: {}", location, e),
        })?;

        let client = ClientBuilder::new()
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(60))
            .gzip(true)
            .user_agent(concat!("plinth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlinthError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config,
            location,
            base_url,
        })
    }

    /// Resolve a path relative to the repository root
    fn url_for(&self, relative: &str) -> RegistryResult<Url> {
        self.base_url.join(relative).map_err(|e| PlinthError::ConfigValidation {
            field: "artifact".to_string(),
            reason: format!("cannot resolve '{}' against {}: {}", relative, self.base_url, e),
        })
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    // Client errors and bad content will not improve on retry
                    let permanent = !error.is_recoverable();
                    last_error = Some(error);

                    if permanent || attempt == self.retry_config.max_retries {
                        break;
                    }

                    tracing::debug!(attempt, ?delay, repository = %self.location, "retrying request");
                    tokio::time::sleep(delay).await;

                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }

        Err(last_error.unwrap_or_else(|| PlinthError::Network {
            message: "Retry operation failed without error".to_string(),
            source: None,
        }))
    }

    /// GET `url` and return the body
    async fn fetch_bytes(&self, url: &Url, what: &str) -> RegistryResult<Vec<u8>> {
        self.with_retry(|| async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| PlinthError::network(format!("Failed to fetch {}: {}", url, e), e))?;

            match response.status() {
                status if status.is_success() => {
                    let bytes = response.bytes().await.map_err(|e| {
                        PlinthError::network(format!("Failed to read {}: {}", url, e), e)
                    })?;
                    Ok(bytes.to_vec())
                },
                status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                    Err(PlinthError::Network {
                        message: format!("{} returned status {}", url, status),
                        source: None,
                    })
                },
                status => Err(PlinthError::DownloadFailure {
                    package: what.to_string(),
                    message: format!("{} returned status {}", url, status),
                    source: None,
                }),
            }
        })
        .await
    }
}

#[async_trait]
impl Repository for HttpRepository {
    fn location(&self) -> &str {
        &self.location
    }

    async fn load_index(&self) -> RegistryResult<RepositoryIndex> {
        let url = self.url_for(INDEX_FILE_NAME)?;
        let bytes = self.fetch_bytes(&url, &self.location).await?;
        let index = RepositoryIndex::from_json(self.location.clone(), &bytes)?;
        tracing::debug!(repository = %self.location, packages = index.len(), "loaded index");
        Ok(index)
    }

    async fn download_package(
        &self,
        definition: &PackageDefinition,
        destination: &Path,
    ) -> RegistryResult<()> {
        let package = definition.identity.to_string();
        let artifact = definition.artifact.as_deref().ok_or_else(|| {
            PlinthError::DownloadFailure {
                package: package.clone(),
                message: "no artifact listed in the repository index".to_string(),
                source: None,
            }
        })?;
        let url = self.url_for(artifact)?;
        let bytes = self.fetch_bytes(&url, &package).await?;

        if let Some(expected) = &definition.checksum {
            verify_integrity(&package, &bytes, expected)?;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PlinthError::io(format!("Failed to create {}", parent.display()), e))?;
        }
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to write {}", destination.display()), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;

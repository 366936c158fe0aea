//! Where configuration comes from, and how it is (re)loaded.
//!
//! # Sources
//!
//! - [`ConfigSource::Local`] - a JSON file, re-read and applied on every refresh
//! - [`ConfigSource::Remote`] - a URL whose document is adopted only when its
//!   `LastUpdated` is newer than the active one; adopted documents are written
//!   to the local cache path so the next start has them offline
//!
//! Cache writes go to a temporary sibling and are renamed into place.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::defaults::DEFAULT_FETCH_TIMEOUT;
use super::document::parse_config;
use super::error::ConfigError;
use super::snapshot::{ConfigOverrides, ConfigSnapshot};

/// Configuration origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Local JSON file.
    Local(PathBuf),
    /// Remote document with a local cache.
    Remote { url: String, cache_path: PathBuf },
}

impl ConfigSource {
    /// Path of the local document (or cache).
    pub fn local_path(&self) -> &Path {
        match self {
            ConfigSource::Local(path) => path,
            ConfigSource::Remote { cache_path, .. } => cache_path,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Local(path) => write!(f, "{}", path.display()),
            ConfigSource::Remote { url, cache_path } => {
                write!(f, "{} (cache {})", url, cache_path.display())
            }
        }
    }
}

/// Loads, validates and caches configuration documents.
pub struct ConfigLoader {
    source: ConfigSource,
    overrides: ConfigOverrides,
    http: reqwest::Client,
}

impl ConfigLoader {
    /// Create a loader for `source`, applying `overrides` to every document.
    pub fn new(source: ConfigSource, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Fetch {
                url: source.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            source,
            overrides,
            http,
        })
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Load the configuration used at startup.
    ///
    /// For a remote source the local cache is read first and the remote
    /// document replaces it when newer. Fails only when neither yields a
    /// valid document.
    pub async fn load_initial(&self) -> Result<ConfigSnapshot, ConfigError> {
        match &self.source {
            ConfigSource::Local(path) => self.load_local(path).await,
            ConfigSource::Remote { url, cache_path } => {
                let cached = match self.load_local(cache_path).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        debug!(error = %e, "No usable cached configuration");
                        None
                    }
                };

                match self.fetch_remote(url).await {
                    Ok((remote, bytes)) => {
                        let newer = cached
                            .as_ref()
                            .map_or(true, |c| remote.last_updated() > c.last_updated());
                        if newer {
                            self.write_cache(cache_path, &bytes).await;
                            return Ok(remote);
                        }
                    }
                    Err(e) => {
                        if cached.is_none() {
                            return Err(e);
                        }
                        warn!(error = %e, "Remote configuration unavailable, using cache");
                    }
                }

                cached.ok_or_else(|| ConfigError::Read {
                    path: cache_path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no cached configuration"),
                })
            }
        }
    }

    /// Load the next configuration, given the active one.
    ///
    /// Returns `Ok(None)` when a remote document is not newer than `current`.
    pub async fn refresh(
        &self,
        current: &ConfigSnapshot,
    ) -> Result<Option<ConfigSnapshot>, ConfigError> {
        match &self.source {
            ConfigSource::Local(path) => self.load_local(path).await.map(Some),
            ConfigSource::Remote { url, cache_path } => {
                let (remote, bytes) = self.fetch_remote(url).await?;
                if remote.last_updated() <= current.last_updated() {
                    debug!(
                        remote = %remote.last_updated(),
                        active = %current.last_updated(),
                        "Remote configuration not newer, keeping active"
                    );
                    return Ok(None);
                }
                self.write_cache(cache_path, &bytes).await;
                Ok(Some(remote))
            }
        }
    }

    async fn load_local(&self, path: &Path) -> Result<ConfigSnapshot, ConfigError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = parse_config(&bytes)?;
        debug!(path = %path.display(), aps = snapshot.catalog.len(), "Loaded local configuration");
        Ok(self.overrides.apply(snapshot))
    }

    async fn fetch_remote(&self, url: &str) -> Result<(ConfigSnapshot, Vec<u8>), ConfigError> {
        let fetch_error = |e: reqwest::Error| ConfigError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let bytes = response.bytes().await.map_err(fetch_error)?.to_vec();

        let snapshot = parse_config(&bytes)?;
        debug!(url, last_updated = %snapshot.last_updated(), "Fetched remote configuration");
        Ok((self.overrides.apply(snapshot), bytes))
    }

    /// Persist an adopted remote document. Failure is logged, not fatal.
    async fn write_cache(&self, path: &Path, bytes: &[u8]) {
        match write_atomic(path, bytes).await {
            Ok(()) => info!(path = %path.display(), "Cached remote configuration"),
            Err(e) => warn!(error = %e, "Failed to cache remote configuration"),
        }
    }
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await.map_err(write_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_error)
}

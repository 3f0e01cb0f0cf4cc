use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    config::{AppConfig, TableSource},
    fetch::Fetcher,
    manifest::CommitMarker,
};

/// Latest commit of the upstream data repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpstreamCommit {
    /// Commit id.
    pub sha: String,
    /// Full commit message.
    pub message: String,
    /// Web URL of the commit.
    pub html_url: String,
    /// Committer timestamp, when present and well-formed.
    pub committed_at: Option<DateTime<Utc>>,
}

impl UpstreamCommit {
    /// Extract the fields of one entry of a GitHub commit listing.
    pub fn from_listing_entry(entry: &Value) -> Option<Self> {
        let sha = entry.get("sha")?.as_str()?.to_string();
        let commit = entry.get("commit");
        let text = |value: Option<&Value>| {
            value
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let committed_at = commit
            .and_then(|commit| commit.pointer("/committer/date"))
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map(|date| date.with_timezone(&Utc));

        Some(Self {
            sha,
            message: text(commit.and_then(|commit| commit.get("message"))),
            html_url: text(entry.get("html_url")),
            committed_at,
        })
    }
}

/// Outcome of comparing the upstream head with the local marker.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Whether the pipeline should run.
    pub proceed: bool,
    /// Commit id stored in the local marker (empty when none).
    pub local: String,
    /// Upstream head, `None` when the repository has no commits.
    pub latest: Option<UpstreamCommit>,
}

impl Decision {
    /// Upstream head id, or an empty string when the repository has no commits.
    pub fn latest_sha(&self) -> &str {
        self.latest
            .as_ref()
            .map(|commit| commit.sha.as_str())
            .unwrap_or_default()
    }
}

/// Watches the upstream repository and mirrors its raw files locally.
pub struct ResourceSync {
    config: AppConfig,
    fetcher: Fetcher,
}

impl ResourceSync {
    /// Create a synchroniser from configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut fetcher = Fetcher::new(config.retry, config.http_timeout)?;
        if let Some(token) = &config.github_token {
            fetcher = fetcher.with_bearer(&config.api_base_url, token)?;
        }
        Ok(Self { config, fetcher })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Marker recording the last exported commit.
    pub fn marker(&self) -> CommitMarker {
        CommitMarker::new(self.config.marker_path())
    }

    /// Fetch the newest commit of the configured branch.
    pub async fn latest_commit(&self) -> Result<Option<UpstreamCommit>> {
        info!(
            owner = %self.config.github_username,
            repo = %self.config.github_repository,
            "fetching upstream commits"
        );
        let listing = self.fetcher.get_json(&self.config.commits_url()).await?;
        let Some(entries) = listing.as_array() else {
            bail!("commit listing is not a list");
        };

        match entries.first() {
            Some(entry) => {
                let commit = UpstreamCommit::from_listing_entry(entry)
                    .context("commit listing entry has no sha")?;
                debug!(sha = %commit.sha, "latest upstream commit");
                Ok(Some(commit))
            }
            None => {
                debug!("no upstream commits found");
                Ok(None)
            }
        }
    }

    /// Compare the upstream head with the local marker.
    ///
    /// `force` runs the pipeline even when both are equal.
    pub async fn check(&self, force: bool) -> Result<Decision> {
        let latest = self.latest_commit().await?;
        let local = self.marker().load()?;
        let latest_sha = latest
            .as_ref()
            .map(|commit| commit.sha.as_str())
            .unwrap_or_default();

        let proceed = force || local != latest_sha;
        if proceed {
            info!(local = %local, latest = %latest_sha, force, "new upstream data");
        } else {
            info!(commit = %local, "already up to date");
        }

        Ok(Decision {
            proceed,
            local,
            latest,
        })
    }

    /// Download configured tables, pause, then download every text map.
    pub async fn download_all(&self) -> Result<()> {
        self.download_tables().await?;
        tokio::time::sleep(self.config.lang_pause).await;
        self.download_languages().await?;
        Ok(())
    }

    /// Download every configured table into the raw data directory.
    pub async fn download_tables(&self) -> Result<Vec<PathBuf>> {
        let dir = self.config.raw_data_dir();
        let mut written = Vec::new();
        for source in TableSource::ALL {
            let Some(filename) = self.config.tables.get(&source) else {
                error!(key = source.env_key(), "table file not configured, skipping");
                continue;
            };
            let url = self.config.raw_table_url(filename);
            written.push(self.download_json(&url, &dir, filename).await?);
        }
        Ok(written)
    }

    /// Download every file listed in the upstream text-map folder.
    pub async fn download_languages(&self) -> Result<Vec<PathBuf>> {
        let dir = self.config.raw_lang_dir();
        let listing = self
            .fetcher
            .get_json(&self.config.lang_listing_url())
            .await?;
        let Some(entries) = listing.as_array() else {
            bail!("text map listing is not a list");
        };

        let mut written = Vec::new();
        for entry in entries {
            let name = entry.get("name").and_then(Value::as_str);
            let url = entry.get("download_url").and_then(Value::as_str);
            let (Some(name), Some(url)) = (name, url) else {
                debug!(?name, "listing entry has no download url, skipping");
                continue;
            };
            written.push(self.download_json(url, &dir, name).await?);
        }
        Ok(written)
    }

    async fn download_json(&self, url: &str, dir: &Path, filename: &str) -> Result<PathBuf> {
        let Some(file_name) = Path::new(filename).file_name() else {
            bail!("invalid file name {filename:?}");
        };
        if file_name != std::ffi::OsStr::new(filename) {
            warn!(filename, "file name contains a path, keeping the last component");
        }

        info!(filename, "downloading");
        let value = self.fetcher.get_json(url).await?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = dir.join(file_name);
        let serialized = serde_json::to_vec(&value)
            .with_context(|| format!("failed to serialize {filename}"))?;
        tokio::fs::write(&path, serialized)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "saved");
        Ok(path)
    }
}

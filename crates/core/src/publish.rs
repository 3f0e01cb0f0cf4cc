//! Publishing of exports by committing and pushing them with git.

use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::{config::PublishSettings, resource::UpstreamCommit};

/// Commits export files in a git working tree and pushes them.
pub struct Publisher {
    repo_dir: PathBuf,
    remote: String,
    branch: Option<String>,
}

impl Publisher {
    /// Publisher operating on the working tree at `repo_dir`.
    pub fn new(repo_dir: impl Into<PathBuf>, settings: &PublishSettings) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: settings.remote.clone(),
            branch: settings.branch.clone(),
        }
    }

    /// Stage `files`, commit them with a message describing `upstream` and push.
    ///
    /// Returns `false` without pushing when nothing changed.
    pub async fn publish(&self, files: &[PathBuf], upstream: &UpstreamCommit) -> Result<bool> {
        if files.is_empty() {
            info!("no export files to publish");
            return Ok(false);
        }

        let mut add = vec!["add".to_string(), "--".to_string()];
        add.extend(files.iter().map(|file| self.relative(file)));
        self.run(&add).await?;

        let staged = self
            .git(&["diff", "--cached", "--quiet"])
            .await
            .context("failed to execute git diff")?;
        if staged.status.success() {
            info!("exports unchanged, nothing to publish");
            return Ok(false);
        }

        let message = commit_message(upstream);
        self.run(&["commit".to_string(), "-m".to_string(), message])
            .await?;

        let mut push = vec!["push".to_string(), self.remote.clone()];
        if let Some(branch) = &self.branch {
            push.push(branch.clone());
        }
        self.run(&push).await?;

        info!(remote = %self.remote, upstream = %upstream.sha, "exports published");
        Ok(true)
    }

    fn relative(&self, file: &Path) -> String {
        file.strip_prefix(&self.repo_dir)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned()
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let output = self
            .git(args)
            .await
            .with_context(|| format!("failed to execute git {}", args.join(" ")))?;

        if !output.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    async fn git<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> std::io::Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await
    }
}

/// Commit message for exports built from `upstream`.
pub fn commit_message(upstream: &UpstreamCommit) -> String {
    let title = upstream.message.trim();
    let title = if title.is_empty() {
        "Update exports"
    } else {
        title
    };

    let mut message = format!("{title}\n\nUpstream: {}", upstream.sha);
    if !upstream.html_url.is_empty() {
        message.push(' ');
        message.push_str(&upstream.html_url);
    }
    if let Some(date) = upstream.committed_at {
        message.push_str(&format!("\nCommitted: {}", date.to_rfc3339()));
    }
    message
}

//! Runtime configuration sourced from the process environment.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::{fetch::RetryPolicy, manifest::MARKER_FILE};

/// Upstream excel tables that are downloaded on every run.
///
/// Each source is enabled by an environment variable naming its file
/// inside the upstream data folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableSource {
    /// `AvatarExcelConfigData`.
    Avatar,
    /// `AvatarSkillDepotExcelConfigData`.
    SkillDepot,
    /// `AvatarSkillExcelConfigData`.
    Skills,
    /// `AvatarTalentExcelConfigData`.
    Talents,
    /// `ReliquaryExcelConfigData`.
    Artifacts,
    /// `WeaponExcelConfigData`.
    Weapons,
    /// `ManualTextMapConfigData`.
    FightProps,
    /// `MaterialExcelConfigData`.
    Namecards,
}

impl TableSource {
    /// Every source in download order.
    pub const ALL: [TableSource; 8] = [
        TableSource::Avatar,
        TableSource::SkillDepot,
        TableSource::Skills,
        TableSource::Talents,
        TableSource::Artifacts,
        TableSource::Weapons,
        TableSource::FightProps,
        TableSource::Namecards,
    ];

    /// Environment variable holding the file name for this source.
    pub fn env_key(self) -> &'static str {
        match self {
            TableSource::Avatar => "AVATAR",
            TableSource::SkillDepot => "SKILLDEPOT",
            TableSource::Skills => "SKILLS",
            TableSource::Talents => "TALENTS",
            TableSource::Artifacts => "ARTIFACTS",
            TableSource::Weapons => "WEAPONS",
            TableSource::FightProps => "FIGHT_PROPS",
            TableSource::Namecards => "NAMECARDS",
        }
    }
}

/// Optional git publishing of the exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    /// Whether `run` publishes by default.
    pub enabled: bool,
    /// Remote to push to.
    pub remote: String,
    /// Branch to push; `None` pushes the current branch.
    pub branch: Option<String>,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Owner of the upstream data repository.
    pub github_username: String,
    /// Name of the upstream data repository.
    pub github_repository: String,
    /// Branch that raw files are read from.
    pub branch: String,
    /// Optional token sent with every request.
    pub github_token: Option<String>,
    /// Folder holding the excel tables inside the upstream repository.
    pub data_folder: String,
    /// Folder holding the text maps inside the upstream repository.
    pub lang_folder: String,
    /// Base URL of the GitHub REST API.
    pub api_base_url: String,
    /// Base URL serving raw repository content.
    pub raw_base_url: String,
    /// Root for raw downloads, exports and the commit marker.
    pub work_dir: PathBuf,
    /// Retry behaviour of every HTTP request.
    pub retry: RetryPolicy,
    /// Per-request timeout.
    pub http_timeout: Duration,
    /// Pause between table downloads and text-map downloads.
    pub lang_pause: Duration,
    /// Git publishing settings.
    pub publish: PublishSettings,
    /// File names of the configured tables; absent sources are skipped.
    pub tables: BTreeMap<TableSource, String>,
}

#[derive(Debug, Deserialize)]
struct Settings {
    github_username: Option<String>,
    github_repository: Option<String>,
    github_branch: String,
    github_token: Option<String>,
    folder: String,
    lang_folder: String,
    api_base_url: String,
    raw_base_url: String,
    work_dir: PathBuf,
    fetch_max_attempts: u32,
    fetch_retry_delay_secs: u64,
    lang_pause_secs: u64,
    http_timeout_secs: u64,
    publish: bool,
    publish_remote: String,
    publish_branch: Option<String>,
    avatar: Option<String>,
    skilldepot: Option<String>,
    skills: Option<String>,
    talents: Option<String>,
    artifacts: Option<String>,
    weapons: Option<String>,
    fight_props: Option<String>,
    namecards: Option<String>,
}

impl Settings {
    fn table(&self, source: TableSource) -> Option<&String> {
        match source {
            TableSource::Avatar => self.avatar.as_ref(),
            TableSource::SkillDepot => self.skilldepot.as_ref(),
            TableSource::Skills => self.skills.as_ref(),
            TableSource::Talents => self.talents.as_ref(),
            TableSource::Artifacts => self.artifacts.as_ref(),
            TableSource::Weapons => self.weapons.as_ref(),
            TableSource::FightProps => self.fight_props.as_ref(),
            TableSource::Namecards => self.namecards.as_ref(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(Environment::default())
    }

    /// Build configuration from an explicit set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::from_source(Environment::default().source(Some(map)))
    }

    fn from_source(environment: Environment) -> Result<Self> {
        let retry = RetryPolicy::default();
        let settings: Settings = Config::builder()
            .set_default("github_branch", "master")?
            .set_default("folder", "ExcelBinOutput")?
            .set_default("lang_folder", "TextMap")?
            .set_default("api_base_url", "https://api.github.com")?
            .set_default("raw_base_url", "https://raw.githubusercontent.com")?
            .set_default("work_dir", ".")?
            .set_default("fetch_max_attempts", i64::from(retry.max_attempts))?
            .set_default("fetch_retry_delay_secs", retry.delay.as_secs() as i64)?
            .set_default("lang_pause_secs", 1_i64)?
            .set_default("http_timeout_secs", 60_i64)?
            .set_default("publish", false)?
            .set_default("publish_remote", "origin")?
            .add_source(environment)
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        let github_username = required(settings.github_username.as_deref(), "GITHUB_USERNAME")?;
        let github_repository =
            required(settings.github_repository.as_deref(), "GITHUB_REPOSITORY")?;

        let mut tables = BTreeMap::new();
        for source in TableSource::ALL {
            if let Some(name) = settings.table(source).map(|name| name.trim()) {
                if !name.is_empty() {
                    tables.insert(source, name.to_string());
                }
            }
        }

        Ok(Self {
            github_username,
            github_repository,
            branch: settings.github_branch,
            github_token: settings
                .github_token
                .filter(|token| !token.trim().is_empty()),
            data_folder: settings.folder.trim_matches('/').to_string(),
            lang_folder: settings.lang_folder.trim_matches('/').to_string(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            raw_base_url: settings.raw_base_url.trim_end_matches('/').to_string(),
            work_dir: settings.work_dir,
            retry: RetryPolicy {
                max_attempts: settings.fetch_max_attempts.max(1),
                delay: Duration::from_secs(settings.fetch_retry_delay_secs),
            },
            http_timeout: Duration::from_secs(settings.http_timeout_secs),
            lang_pause: Duration::from_secs(settings.lang_pause_secs),
            publish: PublishSettings {
                enabled: settings.publish,
                remote: settings.publish_remote,
                branch: settings
                    .publish_branch
                    .filter(|branch| !branch.trim().is_empty()),
            },
            tables,
        })
    }

    /// Directory receiving downloaded excel tables.
    pub fn raw_data_dir(&self) -> PathBuf {
        self.work_dir.join("raw").join("data")
    }

    /// Directory receiving downloaded text maps.
    pub fn raw_lang_dir(&self) -> PathBuf {
        self.work_dir.join("raw").join("langs")
    }

    /// Directory receiving per-kind data exports.
    pub fn export_data_dir(&self) -> PathBuf {
        self.work_dir.join("exports").join("data")
    }

    /// Directory receiving per-kind language exports.
    pub fn export_lang_dir(&self) -> PathBuf {
        self.work_dir.join("exports").join("langs")
    }

    /// Location of the commit marker.
    pub fn marker_path(&self) -> PathBuf {
        self.work_dir.join(MARKER_FILE)
    }

    /// Commit listing for the configured branch, newest first.
    pub fn commits_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/commits?sha={}&per_page=1",
            self.api_base_url, self.github_username, self.github_repository, self.branch
        )
    }

    /// Directory listing of the upstream text-map folder.
    pub fn lang_listing_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base_url,
            self.github_username,
            self.github_repository,
            self.lang_folder,
            self.branch
        )
    }

    /// Raw download URL of a table file in the upstream data folder.
    pub fn raw_table_url(&self, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.raw_base_url,
            self.github_username,
            self.github_repository,
            self.branch,
            self.data_folder,
            filename
        )
    }
}

fn required(value: Option<&str>, key: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("{key} must be set"),
    }
}

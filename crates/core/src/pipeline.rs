//! End-to-end export run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::{
    config::AppConfig,
    export::write_export,
    lang::{join_languages, LangKey},
    link::{link_characters, SkillDepots},
    models::{
        Artifact, Character, Constellation, FightProp, Named, Namecard, Projection, Skill, Weapon,
    },
    projector,
    publish::Publisher,
    resource::{load_languages, load_tables, Languages, RawTables, ResourceSync, UpstreamCommit},
};

/// Fields removed from the skills data export.
pub const SKILL_STRIPPED_FIELDS: &[&str] = &["costElemType"];

/// Every projection of one run, characters already linked.
#[derive(Debug, Clone, Default)]
pub struct Projections {
    /// Skills with an icon.
    pub skills: Projection<Skill>,
    /// Constellations.
    pub constellations: Projection<Constellation>,
    /// Artifacts.
    pub artifacts: Projection<Artifact>,
    /// Weapons.
    pub weapons: Projection<Weapon>,
    /// Namecards.
    pub namecards: Projection<Namecard>,
    /// Fight property names.
    pub fight_props: Projection<FightProp>,
    /// Playable characters.
    pub characters: Projection<Character>,
}

impl Projections {
    /// Project every kind from `tables` and link characters to their depots.
    pub fn build(tables: &RawTables) -> Self {
        let skills = projector::skills(tables);
        let depots = SkillDepots::from_tables(tables);
        let characters = link_characters(projector::characters(tables), &depots, &skills);

        let projections = Self {
            constellations: projector::constellations(tables),
            artifacts: projector::artifacts(tables),
            weapons: projector::weapons(tables),
            namecards: projector::namecards(tables),
            fight_props: projector::fight_props(tables),
            skills,
            characters,
        };
        info!(
            skills = projections.skills.len(),
            constellations = projections.constellations.len(),
            artifacts = projections.artifacts.len(),
            weapons = projections.weapons.len(),
            namecards = projections.namecards.len(),
            fight_props = projections.fight_props.len(),
            characters = projections.characters.len(),
            "projections built"
        );
        projections
    }

    /// Write data and language exports of every kind; returns the written paths.
    pub fn write(
        &self,
        languages: &Languages,
        data_dir: &Path,
        lang_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut writer = ExportWriter {
            languages,
            data_dir,
            lang_dir,
            written: Vec::new(),
        };
        writer.kind("skills.json", &self.skills, SKILL_STRIPPED_FIELDS, LangKey::NameHash)?;
        writer.kind("constellations.json", &self.constellations, &[], LangKey::NameHash)?;
        writer.kind("artifacts.json", &self.artifacts, &[], LangKey::NameHash)?;
        writer.kind("weapons.json", &self.weapons, &[], LangKey::NameHash)?;
        writer.kind("namecards.json", &self.namecards, &[], LangKey::NameHash)?;
        writer.kind("fight_prop.json", &self.fight_props, &[], LangKey::EntityId)?;
        writer.kind("characters.json", &self.characters, &[], LangKey::NameHash)?;
        Ok(writer.written)
    }
}

struct ExportWriter<'a> {
    languages: &'a Languages,
    data_dir: &'a Path,
    lang_dir: &'a Path,
    written: Vec<PathBuf>,
}

impl ExportWriter<'_> {
    fn kind<T: Named + Serialize>(
        &mut self,
        file: &str,
        projection: &Projection<T>,
        strip: &[&str],
        key: LangKey,
    ) -> Result<()> {
        let data_path = self.data_dir.join(file);
        write_export(&data_path, projection, strip)?;
        self.written.push(data_path);

        let lang_path = self.lang_dir.join(file);
        let labels = join_languages(projection, self.languages, key);
        write_export(&lang_path, &labels, &[])?;
        self.written.push(lang_path);

        info!(file, entries = projection.len(), "exported");
        Ok(())
    }
}

/// Switches for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run even if the upstream commit was already exported.
    pub force: bool,
    /// Commit and push the exports afterwards.
    pub publish: bool,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The upstream head was already exported; nothing was written.
    UpToDate {
        /// Commit recorded in the marker.
        commit: String,
    },
    /// Exports were rebuilt from the upstream head.
    Exported {
        /// Upstream head, `None` when the repository has no commits.
        upstream: Option<UpstreamCommit>,
        /// Files written.
        files: Vec<PathBuf>,
        /// Whether a commit was pushed.
        published: bool,
    },
}

/// Change detection, download, projection, export and marker update.
pub struct Pipeline {
    sync: ResourceSync,
}

impl Pipeline {
    /// Pipeline for the given configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            sync: ResourceSync::new(config)?,
        })
    }

    /// Underlying synchroniser, for status queries.
    pub fn sync(&self) -> &ResourceSync {
        &self.sync
    }

    /// Execute one run.
    ///
    /// The marker is only written after every export (and the optional
    /// publish) succeeded, so a failed run is redone in full next time.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome> {
        let config = self.sync.config();
        let decision = self.sync.check(options.force).await?;
        if !decision.proceed {
            return Ok(RunOutcome::UpToDate {
                commit: decision.local,
            });
        }

        self.sync.download_all().await?;

        let tables = load_tables(&config.raw_data_dir())?;
        let languages = load_languages(&config.raw_lang_dir())?;
        info!(
            tables = tables.len(),
            languages = languages.len(),
            "raw data loaded"
        );

        let projections = Projections::build(&tables);
        let files = projections.write(
            &languages,
            &config.export_data_dir(),
            &config.export_lang_dir(),
        )?;

        let published = match (&decision.latest, options.publish) {
            (Some(upstream), true) => {
                Publisher::new(&config.work_dir, &config.publish)
                    .publish(&files, upstream)
                    .await?
            }
            _ => false,
        };

        self.sync.marker().persist(decision.latest_sha())?;
        info!(commit = %decision.latest_sha(), "run complete");

        Ok(RunOutcome::Exported {
            upstream: decision.latest,
            files,
            published,
        })
    }
}

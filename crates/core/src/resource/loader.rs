use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::Record;

const TEXT_MAP_PREFIX: &str = "TextMap";

/// Raw excel tables keyed by table name (file name without extension).
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    tables: HashMap<String, Vec<Record>>,
}

impl RawTables {
    /// Empty set of tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table.
    pub fn insert(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.tables.insert(name.into(), records);
    }

    /// Records of `name`, or an empty slice when the table was not loaded.
    pub fn get(&self, name: &str) -> &[Record] {
        match self.tables.get(name) {
            Some(records) => records.as_slice(),
            None => {
                warn!(table = name, "table not loaded, treating as empty");
                &[]
            }
        }
    }

    /// Number of loaded tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table was loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Text map of one language: stringified hash to display string.
pub type TextMap = HashMap<String, String>;

/// All loaded text maps keyed by language code, in sorted order.
#[derive(Debug, Clone, Default)]
pub struct Languages {
    maps: BTreeMap<String, TextMap>,
}

impl Languages {
    /// Empty language set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the text map for `code`.
    pub fn insert(&mut self, code: impl Into<String>, map: TextMap) {
        self.maps.insert(code.into(), map);
    }

    /// Loaded language codes, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// Iterate over `(code, text map)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TextMap)> {
        self.maps.iter().map(|(code, map)| (code.as_str(), map))
    }

    /// Number of loaded languages.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether no language was loaded.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Load every `*.json` table in `dir`.
///
/// Files whose top level is not an array are skipped, as are array items
/// that are not objects.
pub fn load_tables(dir: &Path) -> Result<RawTables> {
    let mut tables = RawTables::new();
    for path in json_files(dir)? {
        let Some(name) = table_name(&path) else {
            continue;
        };
        debug!(table = %name, "loading table");

        let value: Value = read_json(&path)?;
        let Value::Array(items) = value else {
            warn!(path = %path.display(), "table is not a list, skipping");
            continue;
        };
        let records = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect();
        tables.insert(name, records);
    }
    Ok(tables)
}

/// Load every `*.json` text map in `dir`, keyed by language code.
pub fn load_languages(dir: &Path) -> Result<Languages> {
    let mut languages = Languages::new();
    for path in json_files(dir)? {
        let Some(code) = language_code(&path) else {
            continue;
        };
        debug!(lang = %code, "loading text map");
        let map: TextMap = read_json(&path)?;
        languages.insert(code, map);
    }
    Ok(languages)
}

/// Table name of a file: its name up to the first `.`.
pub fn table_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.split('.').next().unwrap_or_default();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Language code of a text-map file, e.g. `TextMapCHS.json` -> `CHS`.
pub fn language_code(path: &Path) -> Option<String> {
    let code = table_name(path)?.replace(TEXT_MAP_PREFIX, "");
    (!code.is_empty()).then_some(code)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "directory missing, nothing to load");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn names_are_derived_from_file_names() {
        assert_eq!(
            table_name(Path::new("raw/data/AvatarExcelConfigData.json")).as_deref(),
            Some("AvatarExcelConfigData")
        );
        assert_eq!(
            language_code(Path::new("TextMapCHS.json")).as_deref(),
            Some("CHS")
        );
        assert_eq!(
            language_code(Path::new("TextMap_MediumEN.json")).as_deref(),
            Some("_MediumEN")
        );
        assert_eq!(language_code(Path::new("TextMap.json")), None);
    }

    #[test]
    fn loads_tables_and_skips_foreign_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("WeaponExcelConfigData.json"),
            r#"[{"id": 11101, "icon": "UI_EquipIcon_Sword_Blunt"}, 5]"#,
        )?;
        fs::write(dir.path().join("notes.txt"), "not json")?;
        fs::write(dir.path().join("Broken.json"), r#"{"not": "a list"}"#)?;
        fs::create_dir(dir.path().join("nested.json"))?;

        let tables = load_tables(dir.path())?;
        assert_eq!(tables.len(), 1);
        let weapons = tables.get("WeaponExcelConfigData");
        assert_eq!(weapons.len(), 1);
        assert_eq!(weapons[0]["id"], 11101);
        assert!(tables.get("AvatarExcelConfigData").is_empty());
        Ok(())
    }

    #[test]
    fn loads_languages_by_code() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("TextMapEN.json"), r#"{"100": "Amber"}"#)?;
        fs::write(dir.path().join("TextMapJP.json"), r#"{"100": "アンバー"}"#)?;

        let languages = load_languages(dir.path())?;
        assert_eq!(languages.codes().collect::<Vec<_>>(), vec!["EN", "JP"]);
        let (_, jp) = languages.iter().nth(1).unwrap();
        assert_eq!(jp.get("100").map(String::as_str), Some("アンバー"));
        Ok(())
    }

    #[test]
    fn missing_directory_loads_nothing() -> Result<()> {
        let dir = tempdir()?;
        assert!(load_tables(&dir.path().join("absent"))?.is_empty());
        assert!(load_languages(&dir.path().join("absent"))?.is_empty());
        Ok(())
    }
}

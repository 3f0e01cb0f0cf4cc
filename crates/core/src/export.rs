//! JSON export files.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use tracing::debug;

const INDENT: &[u8] = b"    ";

/// Render `data` as 4-space indented UTF-8 JSON.
///
/// `data` must serialize to an object; every field named in `strip` is
/// removed from each of its object values. Key order is preserved.
pub fn render_export<T: Serialize + ?Sized>(data: &T, strip: &[&str]) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(data).context("failed to convert export to JSON")?;
    if !strip.is_empty() {
        if let Value::Object(entries) = &mut value {
            for entry in entries.values_mut() {
                if let Value::Object(fields) = entry {
                    fields.retain(|key, _| !strip.contains(&key.as_str()));
                }
            }
        }
    }

    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut serializer)
        .context("failed to serialize export")?;
    Ok(out)
}

/// Write `data` to `path`, creating parent directories. See [`render_export`].
pub fn write_export<T: Serialize + ?Sized>(path: &Path, data: &T, strip: &[&str]) -> Result<()> {
    let rendered = render_export(data, strip)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "export saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, Projection, Skill};
    use tempfile::tempdir;

    fn skills() -> Projection<Skill> {
        let mut skills = Projection::new();
        skills.insert(
            EntityId::Num(10024),
            Skill {
                name_text_map_hash: EntityId::Num(4074958460),
                skill_icon: "Skill_A_01".to_string(),
                cost_elem_type: "Ice".to_string(),
            },
        );
        skills.insert(
            EntityId::Num(10018),
            Skill {
                name_text_map_hash: EntityId::Num(1),
                skill_icon: "Skill_S_Ayaka_01".to_string(),
                cost_elem_type: String::new(),
            },
        );
        skills
    }

    #[test]
    fn strips_fields_and_indents_with_four_spaces() -> Result<()> {
        let rendered = String::from_utf8(render_export(&skills(), &["costElemType"])?)?;
        let expected = r#"{
    "10018": {
        "nameTextMapHash": 1,
        "skillIcon": "Skill_S_Ayaka_01"
    },
    "10024": {
        "nameTextMapHash": 4074958460,
        "skillIcon": "Skill_A_01"
    }
}"#;
        assert_eq!(rendered, expected);
        Ok(())
    }

    #[test]
    fn non_ascii_is_written_verbatim() -> Result<()> {
        let mut names = std::collections::BTreeMap::new();
        names.insert("1", "神里綾華");
        let rendered = String::from_utf8(render_export(&names, &[])?)?;
        assert!(rendered.contains("神里綾華"));
        Ok(())
    }

    #[test]
    fn reloading_and_rewriting_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data").join("skills.json");
        write_export(&path, &skills(), &["costElemType"])?;

        let written = fs::read(&path)?;
        let reloaded: Value = serde_json::from_slice(&written)?;
        assert_eq!(render_export(&reloaded, &["costElemType"])?, written);
        Ok(())
    }
}

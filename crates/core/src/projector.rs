//! Per-kind projections of the raw excel tables.
//!
//! Each projection keeps a handful of fields from its source table and
//! drops rows that are not wanted in the exports. Rows without an id are
//! skipped. A repeated id keeps the later row.

use tracing::{debug, warn};

use crate::{
    models::{
        Artifact, Character, Constellation, EntityId, FightProp, Namecard, Projection, Record,
        RecordExt, Skill, Weapon,
    },
    resource::RawTables,
};

/// Source table of character rows.
pub const AVATAR_TABLE: &str = "AvatarExcelConfigData";
/// Source table of skill depots.
pub const SKILL_DEPOT_TABLE: &str = "AvatarSkillDepotExcelConfigData";
/// Source table of skills.
pub const SKILL_TABLE: &str = "AvatarSkillExcelConfigData";
/// Source table of constellations.
pub const TALENT_TABLE: &str = "AvatarTalentExcelConfigData";
/// Source table of artifacts.
pub const RELIQUARY_TABLE: &str = "ReliquaryExcelConfigData";
/// Source table of weapons.
pub const WEAPON_TABLE: &str = "WeaponExcelConfigData";
/// Source table of materials, including namecards.
pub const MATERIAL_TABLE: &str = "MaterialExcelConfigData";
/// Source table of manual text-map entries, including fight properties.
pub const MANUAL_TEXT_MAP_TABLE: &str = "ManualTextMapConfigData";

/// Placeholder skill depot shared by non-playable avatars.
pub const SENTINEL_DEPOT_ID: i64 = 101;
/// Icon suffix of the test avatar variant.
pub const TEST_AVATAR_SUFFIX: &str = "_Kate";
/// Material type of profile namecards.
pub const NAMECARD_MATERIAL_TYPE: &str = "MATERIAL_NAMECARD";
/// Prefix of fight property text-map ids.
pub const FIGHT_PROP_PREFIX: &str = "FIGHT_PROP";

fn project<T>(
    records: &[Record],
    id_key: &str,
    mut map: impl FnMut(&Record) -> Option<T>,
) -> Projection<T> {
    let mut projection = Projection::new();
    for record in records {
        let Some(id) = record.id(id_key) else {
            warn!(key = id_key, "record without id, skipping");
            continue;
        };
        if let Some(entity) = map(record) {
            projection.insert(id, entity);
        }
    }
    projection
}

/// Skills that have an icon.
pub fn skills(tables: &RawTables) -> Projection<Skill> {
    project(tables.get(SKILL_TABLE), "id", |record| {
        let skill_icon = record.text("skillIcon");
        if skill_icon.is_empty() {
            debug!(id = ?record.id("id"), "skill has no icon, skipping");
            return None;
        }
        Some(Skill {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            skill_icon,
            cost_elem_type: record.text("costElemType"),
        })
    })
}

/// Every constellation, keyed by talent id.
pub fn constellations(tables: &RawTables) -> Projection<Constellation> {
    project(tables.get(TALENT_TABLE), "talentId", |record| {
        Some(Constellation {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            icon: record.text("icon"),
        })
    })
}

/// Every artifact.
pub fn artifacts(tables: &RawTables) -> Projection<Artifact> {
    project(tables.get(RELIQUARY_TABLE), "id", |record| {
        Some(Artifact {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            item_type: record.text("itemType"),
            equip_type: record.text("equipType"),
            icon: record.text("icon"),
            rank_level: record.int("rankLevel"),
            main_prop_depot_id: record.int("mainPropDepotId"),
            append_prop_depot_id: record.int("appendPropDepotId"),
        })
    })
}

/// Every weapon.
pub fn weapons(tables: &RawTables) -> Projection<Weapon> {
    project(tables.get(WEAPON_TABLE), "id", |record| {
        Some(Weapon {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            icon: record.text("icon"),
            awaken_icon: record.text("awakenIcon"),
            rank_level: record.int("rankLevel"),
        })
    })
}

/// Materials whose type is exactly [`NAMECARD_MATERIAL_TYPE`].
pub fn namecards(tables: &RawTables) -> Projection<Namecard> {
    project(tables.get(MATERIAL_TABLE), "id", |record| {
        let material_type = record.text("materialType");
        if material_type != NAMECARD_MATERIAL_TYPE {
            return None;
        }
        Some(Namecard {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            icon: record.text("icon"),
            pic_path: record.list("picPath"),
            rank_level: record.int("rankLevel"),
            material_type,
        })
    })
}

/// Fight property names, keyed by their `FIGHT_PROP_*` text-map id.
pub fn fight_props(tables: &RawTables) -> Projection<FightProp> {
    project(tables.get(MANUAL_TEXT_MAP_TABLE), "textMapId", |record| {
        if !record.text("textMapId").starts_with(FIGHT_PROP_PREFIX) {
            return None;
        }
        Some(FightProp {
            name_text_map_hash: record
                .id("textMapContentTextMapHash")
                .unwrap_or_default(),
        })
    })
}

/// Playable characters, not yet linked to their skill depots.
///
/// Avatars on the sentinel depot and the test variant are dropped.
pub fn characters(tables: &RawTables) -> Projection<Character> {
    project(tables.get(AVATAR_TABLE), "id", |record| {
        let skill_depot_id = record.id("skillDepotId");
        let icon_name = record.text("iconName");
        if skill_depot_id == Some(EntityId::Num(SENTINEL_DEPOT_ID))
            || icon_name.ends_with(TEST_AVATAR_SUFFIX)
        {
            debug!(id = ?record.id("id"), "non-playable avatar, skipping");
            return None;
        }
        Some(Character {
            name_text_map_hash: record.id("nameTextMapHash").unwrap_or_default(),
            icon_name,
            side_icon_name: record.text("sideIconName"),
            quality_type: record.text("qualityType"),
            cost_elem_type: String::new(),
            skills: Vec::new(),
            talents: None,
            skill_depot_id,
        })
    })
}

use serde::Serialize;
use serde_json::Value;

use super::EntityId;

/// Records carrying a text-map hash for their display name.
pub trait Named {
    /// Hash looked up in every text map.
    fn name_hash(&self) -> &EntityId;
}

macro_rules! impl_named {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Named for $ty {
                fn name_hash(&self) -> &EntityId {
                    &self.name_text_map_hash
                }
            }
        )+
    };
}

/// Character skill with an icon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Icon asset name.
    pub skill_icon: String,
    /// Element of the energy cost, empty for most skills.
    pub cost_elem_type: String,
}

/// Constellation (talent) of a character.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constellation {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Icon asset name.
    pub icon: String,
}

/// Artifact piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Item category.
    pub item_type: String,
    /// Equipment slot.
    pub equip_type: String,
    /// Icon asset name.
    pub icon: String,
    /// Rarity.
    pub rank_level: i64,
    /// Depot of possible main stats.
    pub main_prop_depot_id: i64,
    /// Depot of possible sub stats.
    pub append_prop_depot_id: i64,
}

/// Weapon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Icon asset name.
    pub icon: String,
    /// Icon after ascension.
    pub awaken_icon: String,
    /// Rarity.
    pub rank_level: i64,
}

/// Profile namecard material.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Namecard {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Icon asset name.
    pub icon: String,
    /// Card artwork paths, copied verbatim.
    pub pic_path: Vec<Value>,
    /// Rarity.
    pub rank_level: i64,
    /// Material category.
    pub material_type: String,
}

/// Display name of a fight property, keyed by its `FIGHT_PROP_*` id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FightProp {
    /// Hash of the display text.
    pub name_text_map_hash: EntityId,
}

/// Playable character, linked to its skill depot.
///
/// `talents` is omitted from the serialized record while it is `None`,
/// which is the case when no usable depot was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Name hash.
    pub name_text_map_hash: EntityId,
    /// Portrait asset name.
    pub icon_name: String,
    /// Side portrait asset name.
    pub side_icon_name: String,
    /// Rarity tier.
    pub quality_type: String,
    /// Element of the burst, empty when unresolved.
    pub cost_elem_type: String,
    /// Positive skill ids of the depot, in depot order.
    pub skills: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Constellation ids of the depot.
    pub talents: Option<Vec<Value>>,
    #[serde(skip)]
    /// Depot referenced by the source row.
    pub skill_depot_id: Option<EntityId>,
}

impl_named!(Skill, Constellation, Artifact, Weapon, Namecard, FightProp, Character);

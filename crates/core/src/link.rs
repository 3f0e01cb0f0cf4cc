//! Linking of characters to their skill depots.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    models::{Character, EntityId, Projection, Record, RecordExt, Skill},
    projector::{SENTINEL_DEPOT_ID, SKILL_DEPOT_TABLE},
    resource::RawTables,
};

/// Raw skill depot rows indexed by depot id.
#[derive(Debug, Default)]
pub struct SkillDepots<'a> {
    by_id: HashMap<EntityId, &'a Record>,
}

impl<'a> SkillDepots<'a> {
    /// Index the depot table of `tables`.
    pub fn from_tables(tables: &'a RawTables) -> Self {
        Self::from_records(tables.get(SKILL_DEPOT_TABLE))
    }

    /// Index depot rows; rows without an id are ignored.
    pub fn from_records(records: &'a [Record]) -> Self {
        let by_id = records
            .iter()
            .filter_map(|record| record.id("id").map(|id| (id, record)))
            .collect();
        Self { by_id }
    }

    /// Depot with `id`, if present.
    pub fn get(&self, id: &EntityId) -> Option<&'a Record> {
        self.by_id.get(id).copied()
    }
}

/// Fill `skills`, `talents` and `costElemType` of every character.
///
/// A character whose depot is missing, or is the sentinel depot, keeps
/// empty skills, an empty element and no talents. The element comes from
/// the depot's energy skill and stays empty when that skill was not
/// projected.
pub fn link_characters(
    characters: Projection<Character>,
    depots: &SkillDepots<'_>,
    skills: &Projection<Skill>,
) -> Projection<Character> {
    characters
        .into_iter()
        .map(|(id, character)| {
            let linked = link_character(character, depots, skills);
            (id, linked)
        })
        .collect()
}

fn link_character(
    mut character: Character,
    depots: &SkillDepots<'_>,
    skills: &Projection<Skill>,
) -> Character {
    character.skills.clear();
    character.talents = None;
    character.cost_elem_type.clear();

    let depot = character
        .skill_depot_id
        .as_ref()
        .and_then(|id| depots.get(id))
        .filter(|depot| depot.id("id") != Some(EntityId::Num(SENTINEL_DEPOT_ID)));
    let Some(depot) = depot else {
        debug!(depot = ?character.skill_depot_id, "skill depot not found");
        return character;
    };

    character.talents = Some(depot.list("talents"));
    character.skills = depot
        .int_list("skills")
        .into_iter()
        .filter(|skill| *skill > 0)
        .collect();

    match depot.id("energySkill").and_then(|id| skills.get(&id)) {
        Some(energy) => character.cost_elem_type = energy.cost_elem_type.clone(),
        None => debug!(depot = ?character.skill_depot_id, "energy skill not projected"),
    }
    character
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(rows: Value) -> Vec<Record> {
        rows.as_array()
            .unwrap()
            .iter()
            .map(|row| row.as_object().unwrap().clone())
            .collect()
    }

    fn character(depot: Option<i64>) -> Character {
        Character {
            name_text_map_hash: EntityId::Num(1),
            icon_name: "UI_AvatarIcon_Test".to_string(),
            side_icon_name: String::new(),
            quality_type: "QUALITY_PURPLE".to_string(),
            cost_elem_type: String::new(),
            skills: Vec::new(),
            talents: None,
            skill_depot_id: depot.map(EntityId::Num),
        }
    }

    fn skill(cost: &str) -> Skill {
        Skill {
            name_text_map_hash: EntityId::Num(9),
            skill_icon: "Skill_E".to_string(),
            cost_elem_type: cost.to_string(),
        }
    }

    fn link_one(character: Character, depot_rows: Value, skills: &Projection<Skill>) -> Character {
        let rows = records(depot_rows);
        let depots = SkillDepots::from_records(&rows);
        let mut characters = Projection::new();
        characters.insert(EntityId::Num(10000099), character);
        link_characters(characters, &depots, skills)
            .remove(&EntityId::Num(10000099))
            .unwrap()
    }

    #[test]
    fn keeps_positive_skills_in_order_and_energy_element() {
        let mut skills = Projection::new();
        skills.insert(EntityId::Num(55), skill("Fire"));

        let linked = link_one(
            character(Some(501)),
            json!([{"id": 501, "skills": [0, -5, 101, 102], "talents": [91, 92], "energySkill": 55}]),
            &skills,
        );
        assert_eq!(linked.skills, vec![101, 102]);
        assert_eq!(linked.talents, Some(vec![json!(91), json!(92)]));
        assert_eq!(linked.cost_elem_type, "Fire");
    }

    #[test]
    fn unknown_energy_skill_leaves_element_empty() {
        let linked = link_one(
            character(Some(501)),
            json!([{"id": 501, "skills": [7], "talents": [], "energySkill": 55}]),
            &Projection::new(),
        );
        assert_eq!(linked.cost_elem_type, "");
        assert_eq!(linked.skills, vec![7]);
        assert_eq!(linked.talents, Some(Vec::new()));
    }

    #[test]
    fn missing_or_sentinel_depot_leaves_defaults() {
        let missing = link_one(
            character(Some(777)),
            json!([{"id": 501, "skills": [7]}]),
            &Projection::new(),
        );
        assert!(missing.skills.is_empty());
        assert!(missing.talents.is_none());
        assert_eq!(missing.cost_elem_type, "");

        let sentinel = link_one(
            character(Some(101)),
            json!([{"id": 101, "skills": [7], "talents": [1]}]),
            &Projection::new(),
        );
        assert!(sentinel.skills.is_empty());
        assert!(sentinel.talents.is_none());

        let no_depot = link_one(character(None), json!([]), &Projection::new());
        assert!(no_depot.talents.is_none());
    }

    #[test]
    fn linked_character_serializes_without_depot_id() {
        let mut skills = Projection::new();
        skills.insert(EntityId::Num(55), skill("Water"));
        let linked = link_one(
            character(Some(501)),
            json!([{"id": 501, "skills": [10], "talents": [20], "energySkill": 55}]),
            &skills,
        );
        let value = serde_json::to_value(&linked).unwrap();
        assert_eq!(
            value,
            json!({
                "nameTextMapHash": 1,
                "iconName": "UI_AvatarIcon_Test",
                "sideIconName": "",
                "qualityType": "QUALITY_PURPLE",
                "costElemType": "Water",
                "skills": [10],
                "talents": [20]
            })
        );

        let unlinked = serde_json::to_value(character(None)).unwrap();
        assert!(unlinked.get("talents").is_none());
    }
}

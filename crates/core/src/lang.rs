//! Localization join of projected entities against the loaded text maps.

use std::collections::BTreeMap;

use crate::{
    models::{Named, Projection},
    resource::Languages,
};

/// Display strings of every exported key: key -> language code -> string.
pub type LanguageExport = BTreeMap<String, BTreeMap<String, String>>;

/// Which value keys a row of a [`LanguageExport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangKey {
    /// The entity's name hash in string form.
    NameHash,
    /// The entity's own id, for kinds whose id is already descriptive.
    EntityId,
}

/// Look up every entity's name hash in every loaded language.
///
/// Each row holds exactly one string per loaded language, empty when that
/// language has no entry for the hash. Entities sharing a hash collapse
/// into one row under [`LangKey::NameHash`].
pub fn join_languages<T: Named>(
    entities: &Projection<T>,
    languages: &Languages,
    key: LangKey,
) -> LanguageExport {
    entities
        .iter()
        .map(|(id, entity)| {
            let hash = entity.name_hash().hash_key();
            let strings = languages
                .iter()
                .map(|(code, text_map)| {
                    let text = text_map.get(&hash).cloned().unwrap_or_default();
                    (code.to_string(), text)
                })
                .collect();
            let row_key = match key {
                LangKey::NameHash => hash,
                LangKey::EntityId => id.hash_key(),
            };
            (row_key, strings)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, FightProp, Weapon};
    use crate::resource::TextMap;

    fn languages() -> Languages {
        let mut languages = Languages::new();
        languages.insert(
            "EN",
            TextMap::from([
                ("100".to_string(), "Dull Blade".to_string()),
                ("300".to_string(), "HP".to_string()),
            ]),
        );
        languages.insert(
            "CHS",
            TextMap::from([("100".to_string(), "无锋剑".to_string())]),
        );
        languages
    }

    fn weapon(hash: i64) -> Weapon {
        Weapon {
            name_text_map_hash: EntityId::Num(hash),
            icon: "UI_EquipIcon_Sword_Blunt".to_string(),
            awaken_icon: String::new(),
            rank_level: 1,
        }
    }

    #[test]
    fn rows_are_keyed_by_hash_with_every_language() {
        let mut weapons = Projection::new();
        weapons.insert(EntityId::Num(11101), weapon(100));
        weapons.insert(EntityId::Num(11102), weapon(200));

        let export = join_languages(&weapons, &languages(), LangKey::NameHash);
        assert_eq!(export.len(), 2);
        let blade = &export["100"];
        assert_eq!(blade.len(), 2);
        assert_eq!(blade["EN"], "Dull Blade");
        assert_eq!(blade["CHS"], "无锋剑");

        let missing = &export["200"];
        assert_eq!(missing["EN"], "");
        assert_eq!(missing["CHS"], "");
    }

    #[test]
    fn rows_can_be_keyed_by_entity_id() {
        let mut props = Projection::new();
        props.insert(
            EntityId::from("FIGHT_PROP_HP"),
            FightProp {
                name_text_map_hash: EntityId::Num(300),
            },
        );

        let export = join_languages(&props, &languages(), LangKey::EntityId);
        assert_eq!(export.keys().collect::<Vec<_>>(), vec!["FIGHT_PROP_HP"]);
        assert_eq!(export["FIGHT_PROP_HP"]["EN"], "HP");
        assert_eq!(export["FIGHT_PROP_HP"]["CHS"], "");
    }

    #[test]
    fn no_languages_means_empty_rows() {
        let mut weapons = Projection::new();
        weapons.insert(EntityId::Num(1), weapon(100));
        let export = join_languages(&weapons, &Languages::new(), LangKey::NameHash);
        assert!(export["100"].is_empty());
    }
}

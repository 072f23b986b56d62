//! Per-class profiles used by character generation and leveling.
//!
//! Deliberately coarse: one primary ability, a hit die, a flat base AC,
//! and a default spell slot table. Unknown classes get a generic profile
//! instead of an error so homebrew class names still work.

use crate::character::Ability;
use std::collections::BTreeMap;

/// Class-specific data for character creation and level-up.
#[derive(Debug, Clone)]
pub struct ClassProfile {
    /// The ability the class leans on; +2 at creation.
    pub primary: Option<Ability>,
    /// Hit die size rolled on level-up.
    pub hit_die: u32,
    /// Flat starting armor class.
    pub base_ac: i32,
    /// Spell slots granted at creation and restored on a long rest.
    pub default_slots: BTreeMap<u8, u32>,
}

impl ClassProfile {
    /// Look up the profile for a class name (case-insensitive).
    pub fn for_class(name: &str) -> ClassProfile {
        let (primary, hit_die, base_ac, slots): (Option<Ability>, u32, i32, &[(u8, u32)]) =
            match name.trim().to_lowercase().as_str() {
                "wizard" => (Some(Ability::Intelligence), 6, 12, &[(1, 2), (2, 0), (3, 0)]),
                "sorcerer" => (Some(Ability::Charisma), 6, 12, &[(1, 2)]),
                "warlock" => (Some(Ability::Charisma), 8, 13, &[(1, 1)]),
                "cleric" => (Some(Ability::Wisdom), 8, 15, &[(1, 2)]),
                "fighter" => (Some(Ability::Strength), 10, 16, &[]),
                "rogue" => (Some(Ability::Dexterity), 8, 14, &[]),
                "ranger" => (Some(Ability::Dexterity), 10, 15, &[]),
                "paladin" => (Some(Ability::Strength), 10, 18, &[]),
                "barbarian" => (Some(Ability::Strength), 12, 14, &[]),
                _ => (None, 8, 10, &[]),
            };

        ClassProfile {
            primary,
            hit_die,
            base_ac,
            default_slots: slots.iter().copied().collect(),
        }
    }

    /// Whether the class casts spells. Spell-capable classes gain an
    /// extra level-1 slot on level-up.
    pub fn is_spellcaster(&self) -> bool {
        !self.default_slots.is_empty()
    }

    /// Fallback skill picks when the data provider has nothing to offer.
    pub fn fallback_skills(name: &str) -> &'static [&'static str] {
        match name.trim().to_lowercase().as_str() {
            "wizard" => &["Arcana", "History", "Investigation"],
            "fighter" => &["Athletics", "Survival", "Intimidation"],
            "rogue" => &["Stealth", "Acrobatics", "Sleight of Hand"],
            "cleric" => &["Religion", "Insight", "Medicine"],
            _ => &["Perception", "Athletics"],
        }
    }
}

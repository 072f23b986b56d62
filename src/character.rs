//! Character data model and resource management.
//!
//! A [`Character`] owns every mutable resource a player tracks between
//! encounters: hit points, spell slots, level, inventory, and the death
//! save state machine. One character exists per (guild, lowercase name).

use crate::class_data::ClassProfile;
use crate::error::GameError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse an abbreviation or full name, case-insensitively.
    pub fn parse(input: &str) -> Option<Ability> {
        let lower = input.trim().to_lowercase();
        Ability::all()
            .into_iter()
            .find(|a| a.abbreviation().to_lowercase() == lower || a.name().to_lowercase() == lower)
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: u8) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    /// Apply a bonus (possibly negative), clamped to the playable range.
    pub fn adjust(&mut self, ability: Ability, bonus: i32) {
        let value = (self.get(ability) as i32 + bonus).clamp(1, 30);
        self.set(ability, value as u8);
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        // Floor division handles scores below 10 correctly.
        (self.get(ability) as i32 - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Death Saves
// ============================================================================

/// Death saving throw counters. Only meaningful while hp <= 0; reset
/// whenever the character returns above 0 hp through any path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: u8,
    pub failures: u8,
}

impl DeathSaves {
    pub fn reset(&mut self) {
        self.successes = 0;
        self.failures = 0;
    }
}

/// Outcome of one death saving throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathSaveOutcome {
    /// Natural 20: back to 1 hp, conscious, counters cleared.
    Revived,
    /// Three successes: unconscious at <= 0 hp but stable, counters cleared.
    Stabilized,
    /// Three failures: the character is gone. The store removes them.
    Dead,
    /// Still dying; current counter state.
    Dying { successes: u8, failures: u8 },
}

// ============================================================================
// Inventory
// ============================================================================

/// One carried item. Description paragraphs are present only for items
/// pulled from the data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
}

impl ItemRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Vec::new(),
        }
    }
}

// ============================================================================
// Character
// ============================================================================

/// Report returned by [`Character::level_up`].
#[derive(Debug, Clone, Copy)]
pub struct LevelUpReport {
    pub new_level: u32,
    pub hp_gain: i32,
    pub new_max_hp: i32,
}

/// A persisted player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: u32,
    /// Current hit points; unclamped, may go negative.
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub abilities: AbilityScores,
    pub skills: Vec<String>,
    pub spells: Vec<String>,
    /// Remaining spell slots by slot level (1..9).
    pub slots: BTreeMap<u8, u32>,
    pub inventory: Vec<ItemRef>,
    pub death_saves: DeathSaves,
}

impl Character {
    /// Apply damage; hp is unclamped and may go negative.
    ///
    /// No death-save transition happens here: damage outside an encounter
    /// leaves the counters alone. The encounter path owns that sync.
    pub fn apply_damage(&mut self, amount: i32) {
        self.hp -= amount;
    }

    /// Apply healing; not capped at max_hp (allowed simplification).
    /// Returning above 0 hp clears any death save progress.
    pub fn apply_healing(&mut self, amount: i32) {
        self.hp += amount;
        if self.hp > 0 {
            self.death_saves.reset();
        }
    }

    /// Force the character to exactly 0 hp and restart the dying state.
    /// Used by the encounter sync when the matching combatant drops.
    pub fn drop_to_zero(&mut self) {
        self.hp = 0;
        self.death_saves.reset();
    }

    /// Spend one spell slot of the given level.
    pub fn consume_slot(&mut self, level: u8) -> Result<u32, GameError> {
        match self.slots.get_mut(&level) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(*count)
            }
            _ => Err(GameError::InsufficientResource { level }),
        }
    }

    /// Long rest: replace the slot table wholesale and heal to full.
    pub fn restore_slots(&mut self, defaults: BTreeMap<u8, u32>) {
        self.slots = defaults;
        self.hp = self.max_hp;
        self.death_saves.reset();
    }

    /// Advance one level: roll the class hit die plus CON modifier
    /// (minimum 1), raise max hp, heal to full, and grant spellcasters
    /// an extra level-1 slot (flat increment, a deliberate simplification).
    pub fn level_up<R: Rng>(&mut self, rng: &mut R) -> LevelUpReport {
        let profile = ClassProfile::for_class(&self.class);
        self.level += 1;

        let roll = rng.gen_range(1..=profile.hit_die) as i32;
        let hp_gain = (roll + self.abilities.modifier(Ability::Constitution)).max(1);
        self.max_hp += hp_gain;
        self.hp = self.max_hp;
        self.death_saves.reset();

        if profile.is_spellcaster() {
            *self.slots.entry(1).or_insert(0) += 1;
        }

        LevelUpReport {
            new_level: self.level,
            hp_gain,
            new_max_hp: self.max_hp,
        }
    }

    /// Record one death saving throw.
    ///
    /// Valid only while hp <= 0. The caller deletes the character from
    /// the store when the outcome is [`DeathSaveOutcome::Dead`].
    pub fn record_death_save(&mut self, roll: u32) -> Result<DeathSaveOutcome, GameError> {
        if self.hp > 0 {
            return Err(GameError::StateConflict(format!(
                "{} is not at 0 hp and does not need a death save",
                self.name
            )));
        }

        match roll {
            20 => {
                self.hp = 1;
                self.death_saves.reset();
                return Ok(DeathSaveOutcome::Revived);
            }
            1 => self.death_saves.failures += 2,
            10..=19 => self.death_saves.successes += 1,
            _ => self.death_saves.failures += 1,
        }

        if self.death_saves.failures >= 3 {
            return Ok(DeathSaveOutcome::Dead);
        }
        if self.death_saves.successes >= 3 {
            self.death_saves.reset();
            return Ok(DeathSaveOutcome::Stabilized);
        }
        Ok(DeathSaveOutcome::Dying {
            successes: self.death_saves.successes,
            failures: self.death_saves.failures,
        })
    }

    /// Whether the character knows a spell by name, case-insensitively.
    /// Returns the canonical stored name.
    pub fn known_spell(&self, name: &str) -> Option<&str> {
        self.spells
            .iter()
            .find(|s| s.eq_ignore_ascii_case(name.trim()))
            .map(|s| s.as_str())
    }

    /// Whether the character is proficient in a skill, case-insensitively.
    pub fn knows_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(name.trim()))
    }

    pub fn add_item(&mut self, item: ItemRef) {
        self.inventory.push(item);
    }

    /// Remove the first inventory entry matching the name. Returns the
    /// removed item, or None if the character does not carry it.
    pub fn remove_item(&mut self, name: &str) -> Option<ItemRef> {
        let index = self
            .inventory
            .iter()
            .position(|i| i.name.eq_ignore_ascii_case(name.trim()))?;
        Some(self.inventory.remove(index))
    }
}

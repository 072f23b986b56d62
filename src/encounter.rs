//! Encounter tracking: turn order, initiative, and combatant state.
//!
//! At most one [`Encounter`] exists per guild. Combatants are ephemeral;
//! monsters and NPCs never become stored characters. The only link back
//! to a [`crate::character::Character`] is a matching name, and the
//! session layer owns that sync.

use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One participant in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    /// Unclamped; may go negative.
    pub hp: i32,
    pub initiative: i32,
    pub ac: i32,
    /// Free-text status labels, in the order applied. No numeric semantics.
    #[serde(default)]
    pub effects: Vec<String>,
}

/// Default armor class when the caller does not supply one.
pub const DEFAULT_AC: i32 = 10;

/// Result of applying damage to a combatant.
#[derive(Debug, Clone)]
pub struct CombatDamage {
    pub name: String,
    pub hp_after: i32,
    /// True when this hit left the combatant at or below 0 hp.
    pub dropped: bool,
}

/// One guild's active combat session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Combatants sorted by initiative descending; ties keep insertion order.
    pub order: Vec<Combatant>,
    /// Index of the acting combatant. Meaningless while `order` is empty.
    pub turn: usize,
}

impl Encounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant and re-sort the order.
    ///
    /// The sort is stable, so equal initiatives keep their insertion
    /// order. Names must be unique within the encounter (case-insensitive)
    /// because every other operation addresses combatants by name.
    pub fn add_combatant(
        &mut self,
        name: impl Into<String>,
        hp: i32,
        initiative: i32,
        ac: Option<i32>,
    ) -> Result<&Combatant, GameError> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(GameError::StateConflict(format!(
                "'{name}' is already in the encounter"
            )));
        }

        self.order.push(Combatant {
            name,
            hp,
            initiative,
            ac: ac.unwrap_or(DEFAULT_AC),
            effects: Vec::new(),
        });
        self.order.sort_by_key(|c| Reverse(c.initiative));

        // The new combatant is the last one with this initiative.
        let index = self
            .order
            .iter()
            .rposition(|c| c.initiative == initiative)
            .unwrap_or(self.order.len() - 1);
        Ok(&self.order[index])
    }

    /// Advance the turn pointer, wrapping at the end of the order.
    /// Dead combatants still receive turns; nothing removes them.
    pub fn next_turn(&mut self) -> Result<&Combatant, GameError> {
        if self.order.is_empty() {
            return Err(GameError::StateConflict(
                "the encounter has no combatants".to_string(),
            ));
        }
        self.turn = (self.turn + 1) % self.order.len();
        Ok(&self.order[self.turn])
    }

    /// The combatant whose turn it is, if any.
    pub fn current(&self) -> Option<&Combatant> {
        self.order.get(self.turn)
    }

    /// Case-insensitive first-match lookup.
    pub fn find(&self, name: &str) -> Option<&Combatant> {
        self.order.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Combatant, GameError> {
        self.order
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| GameError::not_found("combatant", name))
    }

    /// Apply damage to a combatant; hp is unclamped.
    pub fn damage(&mut self, name: &str, amount: i32) -> Result<CombatDamage, GameError> {
        let combatant = self.find_mut(name)?;
        combatant.hp -= amount;
        Ok(CombatDamage {
            name: combatant.name.clone(),
            hp_after: combatant.hp,
            dropped: combatant.hp <= 0,
        })
    }

    /// Heal a combatant; hp is unclamped above any maximum.
    pub fn heal(&mut self, name: &str, amount: i32) -> Result<&Combatant, GameError> {
        let combatant = self.find_mut(name)?;
        combatant.hp += amount;
        Ok(combatant)
    }

    /// Append a free-text effect label. There is no removal operation;
    /// labels live until the encounter ends.
    pub fn add_effect(&mut self, name: &str, effect: impl Into<String>) -> Result<&Combatant, GameError> {
        let combatant = self.find_mut(name)?;
        combatant.effects.push(effect.into());
        Ok(combatant)
    }

    /// Overwrite a combatant's armor class.
    pub fn set_ac(&mut self, name: &str, ac: i32) -> Result<&Combatant, GameError> {
        let combatant = self.find_mut(name)?;
        combatant.ac = ac;
        Ok(combatant)
    }
}

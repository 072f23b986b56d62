//! Spell casting resolution.
//!
//! Orchestrates the character's slot accounting, the dice engine, and a
//! fetched spell detail. The damage expression is resolved and validated
//! *before* any slot is consumed, so a malformed expression never leaks
//! a slot.

use crate::character::Character;
use crate::dice::DiceExpression;
use crate::error::GameError;
use crate::provider::SpellDetail;
use rand::Rng;

/// Rolled damage for a cast.
#[derive(Debug, Clone)]
pub struct DamageRoll {
    pub expression: String,
    pub rolls: Vec<u32>,
    pub total: i32,
}

/// Result of a resolved cast.
#[derive(Debug, Clone)]
pub struct CastOutcome {
    /// Canonical spell name from the provider.
    pub spell: String,
    pub level: u8,
    /// Slot level consumed, if the spell is leveled.
    pub slot_spent: Option<u8>,
    /// Flavor d20; not compared against any AC or DC.
    pub effect_roll: u32,
    pub damage: Option<DamageRoll>,
    /// First description paragraph, for pure-effect spells.
    pub description: Option<String>,
}

/// Pick the damage expression for a cast, top-down:
/// (a) the slot-level table at an explicitly requested slot level,
/// (b) the slot-level table at the spell's own level,
/// (c) the first entry of the character-level table,
/// (d) none (pure-effect spell).
pub fn resolve_damage_expression(
    detail: &SpellDetail,
    requested_slot: Option<u8>,
) -> Option<&str> {
    if let Some(slot) = requested_slot {
        if let Some(expr) = detail.damage_at_slot_level.get(&slot) {
            return Some(expr);
        }
    }
    if let Some(expr) = detail.damage_at_slot_level.get(&detail.level) {
        return Some(expr);
    }
    detail
        .damage_at_character_level
        .values()
        .next()
        .map(|s| s.as_str())
}

/// Resolve a cast against a character.
///
/// The caller has already verified the character knows the spell and has
/// fetched the detail. Leveled spells consume one slot at the spell's
/// level; the consumption happens only after the damage expression (if
/// any) parsed cleanly.
pub fn cast<R: Rng>(
    character: &mut Character,
    detail: &SpellDetail,
    requested_slot: Option<u8>,
    rng: &mut R,
) -> Result<CastOutcome, GameError> {
    let expression = resolve_damage_expression(detail, requested_slot)
        .map(|expr| DiceExpression::parse(expr).map_err(GameError::from))
        .transpose()?;

    let slot_spent = if detail.level > 0 {
        character.consume_slot(detail.level)?;
        Some(detail.level)
    } else {
        None
    };

    let effect_roll = rng.gen_range(1..=20u32);

    let damage = expression.map(|expr| {
        let result = expr.roll_with_rng(rng);
        DamageRoll {
            expression: expr.original.clone(),
            rolls: result.rolls,
            total: result.total,
        }
    });

    let description = if damage.is_none() {
        detail.description.first().cloned()
    } else {
        None
    };

    Ok(CastOutcome {
        spell: detail.name.clone(),
        level: detail.level,
        slot_spent,
        effect_roll,
        damage,
        description,
    })
}

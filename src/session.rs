//! GameSession - the primary public API for guild gameplay.
//!
//! Wraps the session store, the data provider, and the dice RNG into one
//! interface with a method per command-surface operation. Every mutating
//! method holds its guild's lock for the whole operation, flush included,
//! so operations against one guild never observe torn state; different
//! guilds run concurrently.

use crate::builder::generate_character;
use crate::casting::{self, CastOutcome};
use crate::character::{Ability, Character, DeathSaveOutcome, ItemRef, LevelUpReport};
use crate::class_data::ClassProfile;
use crate::dice::{roll_d20_with_modifier, DiceExpression, RollResult};
use crate::encounter::{CombatDamage, Combatant, Encounter};
use crate::error::GameError;
use crate::provider::{slugify, DataProvider, ItemDetail, MonsterDetail};
use crate::store::{GuildId, SessionStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of an attack roll against a combatant's AC. Pure report; no
/// state changes.
#[derive(Debug, Clone)]
pub struct AttackReport {
    pub attacker: String,
    pub target: String,
    /// The first die that came up.
    pub die: u32,
    pub total: i32,
    pub target_ac: i32,
    pub hit: bool,
}

/// Result of an ability saving throw. Pure report; no state changes.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub name: String,
    pub ability: Ability,
    pub die: u32,
    pub modifier: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
}

/// Result of a skill check.
#[derive(Debug, Clone)]
pub struct SkillCheckReport {
    pub name: String,
    pub skill: String,
    pub die: u32,
    pub bonus: i32,
    pub total: i32,
}

/// Result of one death saving throw, including the d20 rolled.
#[derive(Debug, Clone)]
pub struct DeathSaveReport {
    pub name: String,
    pub roll: u32,
    pub outcome: DeathSaveOutcome,
}

/// The high-level game API, shared across guilds.
pub struct GameSession {
    store: Arc<SessionStore>,
    provider: Arc<dyn DataProvider>,
    rng: Mutex<StdRng>,
}

impl GameSession {
    pub fn new(store: Arc<SessionStore>, provider: Arc<dyn DataProvider>) -> Self {
        Self::with_rng(store, provider, StdRng::from_entropy())
    }

    /// Construct with a seeded RNG for reproducible rolls.
    pub fn with_rng(
        store: Arc<SessionStore>,
        provider: Arc<dyn DataProvider>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            provider,
            rng: Mutex::new(rng),
        }
    }

    // ------------------------------------------------------------------
    // Dice
    // ------------------------------------------------------------------

    /// Evaluate a dice expression with the session RNG.
    pub async fn roll(&self, expression: &str) -> Result<RollResult, GameError> {
        let expr = DiceExpression::parse(expression)?;
        let mut rng = self.rng.lock().await;
        Ok(expr.roll_with_rng(&mut *rng))
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Generate and store a character. An existing character with the
    /// same name is replaced.
    pub async fn create_character(
        &self,
        guild: &GuildId,
        name: &str,
        race: &str,
        class: &str,
    ) -> Result<Character, GameError> {
        let character = {
            let mut rng = self.rng.lock().await;
            generate_character(name, race, class, self.provider.as_ref(), &mut *rng).await
        };

        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        state.insert_character(character.clone());
        self.store.flush(guild, &state).await;
        Ok(character)
    }

    pub async fn character(&self, guild: &GuildId, name: &str) -> Result<Character, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        Ok(state.character(name)?.clone())
    }

    /// Damage a stored character directly (out-of-combat damage). No
    /// death-save transition happens on this path.
    pub async fn damage_character(
        &self,
        guild: &GuildId,
        name: &str,
        amount: i32,
    ) -> Result<i32, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let character = state.character_mut(name)?;
        character.apply_damage(amount);
        let hp = character.hp;
        self.store.flush(guild, &state).await;
        Ok(hp)
    }

    /// Heal a stored character directly.
    pub async fn heal_character(
        &self,
        guild: &GuildId,
        name: &str,
        amount: i32,
    ) -> Result<i32, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let character = state.character_mut(name)?;
        character.apply_healing(amount);
        let hp = character.hp;
        self.store.flush(guild, &state).await;
        Ok(hp)
    }

    pub async fn level_up(&self, guild: &GuildId, name: &str) -> Result<LevelUpReport, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let character = state.character_mut(name)?;
        let report = {
            let mut rng = self.rng.lock().await;
            character.level_up(&mut *rng)
        };
        self.store.flush(guild, &state).await;
        Ok(report)
    }

    pub async fn slots(&self, guild: &GuildId, name: &str) -> Result<BTreeMap<u8, u32>, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        Ok(state.character(name)?.slots.clone())
    }

    /// Long rest: restore class-default slots and heal to full.
    pub async fn long_rest(&self, guild: &GuildId, name: &str) -> Result<Character, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let character = state.character_mut(name)?;
        let defaults = ClassProfile::for_class(&character.class).default_slots;
        character.restore_slots(defaults);
        let snapshot = character.clone();
        self.store.flush(guild, &state).await;
        Ok(snapshot)
    }

    /// Cast a spell the character knows.
    ///
    /// The lookup half lives here: the character must know the spell
    /// case-insensitively (NotFound) and the provider must serve its
    /// detail (ProviderUnavailable). Slot accounting and rolling are in
    /// [`crate::casting`].
    pub async fn cast(
        &self,
        guild: &GuildId,
        name: &str,
        spell: &str,
        requested_slot: Option<u8>,
    ) -> Result<CastOutcome, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;

        let known = state
            .character(name)?
            .known_spell(spell)
            .ok_or_else(|| GameError::not_found("spell", spell.trim()))?
            .to_string();

        let detail = self
            .provider
            .fetch_spell_detail(&slugify(&known))
            .await
            .map_err(|err| GameError::ProviderUnavailable(err.to_string()))?
            .ok_or_else(|| {
                GameError::ProviderUnavailable(format!("no data served for spell '{known}'"))
            })?;

        let character = state.character_mut(name)?;
        let outcome = {
            let mut rng = self.rng.lock().await;
            casting::cast(character, &detail, requested_slot, &mut *rng)?
        };
        self.store.flush(guild, &state).await;
        Ok(outcome)
    }

    /// Roll a death save for a character at 0 hp or below. Three
    /// failures delete the character from the store; that is terminal.
    pub async fn death_save(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<DeathSaveReport, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let character = state.character_mut(name)?;

        let roll = {
            let mut rng = self.rng.lock().await;
            rng.gen_range(1..=20u32)
        };
        let outcome = character.record_death_save(roll)?;
        let display_name = character.name.clone();
        if outcome == DeathSaveOutcome::Dead {
            state.remove_character(name);
        }
        self.store.flush(guild, &state).await;
        Ok(DeathSaveReport {
            name: display_name,
            roll,
            outcome,
        })
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    pub async fn inventory_add(
        &self,
        guild: &GuildId,
        name: &str,
        item: &str,
    ) -> Result<(), GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        state.character_mut(name)?.add_item(ItemRef::named(item));
        self.store.flush(guild, &state).await;
        Ok(())
    }

    /// Add an item with its detail fetched from the provider.
    pub async fn inventory_add_from_provider(
        &self,
        guild: &GuildId,
        name: &str,
        item: &str,
    ) -> Result<ItemRef, GameError> {
        let detail = self
            .provider
            .fetch_item_detail(&slugify(item))
            .await
            .map_err(|err| GameError::ProviderUnavailable(err.to_string()))?
            .ok_or_else(|| GameError::not_found("item", item.trim()))?;

        let item_ref = ItemRef {
            name: detail.name,
            description: detail.description,
        };

        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        state.character_mut(name)?.add_item(item_ref.clone());
        self.store.flush(guild, &state).await;
        Ok(item_ref)
    }

    pub async fn inventory(&self, guild: &GuildId, name: &str) -> Result<Vec<ItemRef>, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        Ok(state.character(name)?.inventory.clone())
    }

    pub async fn inventory_remove(
        &self,
        guild: &GuildId,
        name: &str,
        item: &str,
    ) -> Result<ItemRef, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let removed = state
            .character_mut(name)?
            .remove_item(item)
            .ok_or_else(|| GameError::not_found("item", item.trim()))?;
        self.store.flush(guild, &state).await;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Encounters
    // ------------------------------------------------------------------

    /// Start a fresh encounter, replacing any existing one.
    pub async fn start_encounter(&self, guild: &GuildId) -> Result<(), GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        state.encounter = Some(Encounter::new());
        self.store.flush(guild, &state).await;
        Ok(())
    }

    pub async fn add_combatant(
        &self,
        guild: &GuildId,
        name: &str,
        hp: i32,
        initiative: i32,
        ac: Option<i32>,
    ) -> Result<Combatant, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let added = state
            .encounter_mut()?
            .add_combatant(name, hp, initiative, ac)?
            .clone();
        self.store.flush(guild, &state).await;
        Ok(added)
    }

    pub async fn encounter(&self, guild: &GuildId) -> Result<Encounter, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        Ok(state.encounter()?.clone())
    }

    pub async fn next_turn(&self, guild: &GuildId) -> Result<Combatant, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let current = state.encounter_mut()?.next_turn()?.clone();
        self.store.flush(guild, &state).await;
        Ok(current)
    }

    /// Damage a combatant. When the hit drops them to 0 hp or below and
    /// a character of the same name exists in this guild, that character
    /// is forced to exactly 0 hp with fresh death-save counters - a
    /// one-way push into the dying state.
    pub async fn damage_combatant(
        &self,
        guild: &GuildId,
        name: &str,
        amount: i32,
    ) -> Result<CombatDamage, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let report = state.encounter_mut()?.damage(name, amount)?;
        if report.dropped {
            if let Ok(character) = state.character_mut(name) {
                character.drop_to_zero();
            }
        }
        self.store.flush(guild, &state).await;
        Ok(report)
    }

    pub async fn heal_combatant(
        &self,
        guild: &GuildId,
        name: &str,
        amount: i32,
    ) -> Result<Combatant, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let healed = state.encounter_mut()?.heal(name, amount)?.clone();
        self.store.flush(guild, &state).await;
        Ok(healed)
    }

    pub async fn add_effect(
        &self,
        guild: &GuildId,
        name: &str,
        effect: &str,
    ) -> Result<Combatant, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let combatant = state.encounter_mut()?.add_effect(name, effect)?.clone();
        self.store.flush(guild, &state).await;
        Ok(combatant)
    }

    pub async fn set_combatant_ac(
        &self,
        guild: &GuildId,
        name: &str,
        ac: i32,
    ) -> Result<Combatant, GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        let combatant = state.encounter_mut()?.set_ac(name, ac)?.clone();
        self.store.flush(guild, &state).await;
        Ok(combatant)
    }

    pub async fn end_encounter(&self, guild: &GuildId) -> Result<(), GameError> {
        let handle = self.store.guild(guild).await;
        let mut state = handle.lock().await;
        if state.encounter.take().is_none() {
            return Err(GameError::StateConflict("no active encounter".to_string()));
        }
        self.store.flush(guild, &state).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attack, saves, checks
    // ------------------------------------------------------------------

    /// Evaluate an attack roll against a combatant's AC. Both parties
    /// must be in the encounter. The roll input may be empty (plain d20),
    /// a bare modifier, or a full expression. No state is mutated;
    /// applying damage is a separate command.
    pub async fn attack(
        &self,
        guild: &GuildId,
        attacker: &str,
        target: &str,
        expression: &str,
    ) -> Result<AttackReport, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        let encounter = state.encounter()?;
        let attacker = encounter
            .find(attacker)
            .ok_or_else(|| GameError::not_found("combatant", attacker))?;
        let target = encounter
            .find(target)
            .ok_or_else(|| GameError::not_found("combatant", target))?;

        let roll = {
            let mut rng = self.rng.lock().await;
            roll_d20_with_modifier(expression, &mut *rng)?
        };

        Ok(AttackReport {
            attacker: attacker.name.clone(),
            target: target.name.clone(),
            hit: roll.total >= target.ac,
            target_ac: target.ac,
            die: roll.die,
            total: roll.total,
        })
    }

    /// Ability saving throw for a combatant against a DC. The modifier
    /// comes from the matching stored character when one exists,
    /// otherwise 0. No state is mutated.
    pub async fn saving_throw(
        &self,
        guild: &GuildId,
        name: &str,
        ability: &str,
        dc: i32,
    ) -> Result<SaveReport, GameError> {
        let ability = Ability::parse(ability)
            .ok_or_else(|| GameError::InvalidInput(format!("unknown ability '{ability}'")))?;

        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        let combatant = state
            .encounter()?
            .find(name)
            .ok_or_else(|| GameError::not_found("combatant", name))?;

        let modifier = state
            .character(name)
            .map(|c| c.abilities.modifier(ability))
            .unwrap_or(0);

        let die = {
            let mut rng = self.rng.lock().await;
            rng.gen_range(1..=20u32)
        };
        let total = die as i32 + modifier;

        Ok(SaveReport {
            name: combatant.name.clone(),
            ability,
            die,
            modifier,
            total,
            dc,
            success: total >= dc,
        })
    }

    /// Skill check for a stored character: d20 plus a flat +2 when the
    /// skill is known.
    pub async fn skill_check(
        &self,
        guild: &GuildId,
        name: &str,
        skill: &str,
    ) -> Result<SkillCheckReport, GameError> {
        let handle = self.store.guild(guild).await;
        let state = handle.lock().await;
        let character = state.character(name)?;
        let bonus = if character.knows_skill(skill) { 2 } else { 0 };

        let die = {
            let mut rng = self.rng.lock().await;
            rng.gen_range(1..=20u32)
        };

        Ok(SkillCheckReport {
            name: character.name.clone(),
            skill: skill.trim().to_string(),
            die,
            bonus,
            total: die as i32 + bonus,
        })
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub async fn monster(&self, name: &str) -> Result<MonsterDetail, GameError> {
        self.provider
            .fetch_monster_detail(&slugify(name))
            .await
            .map_err(|err| GameError::ProviderUnavailable(err.to_string()))?
            .ok_or_else(|| GameError::not_found("monster", name.trim()))
    }

    pub async fn item(&self, name: &str) -> Result<ItemDetail, GameError> {
        self.provider
            .fetch_item_detail(&slugify(name))
            .await
            .map_err(|err| GameError::ProviderUnavailable(err.to_string()))?
            .ok_or_else(|| GameError::not_found("item", name.trim()))
    }
}

//! Character generation workflow.
//!
//! Seeds a new [`Character`] from base scores, race bonuses fetched from
//! the data provider, and the class profile. Provider failures degrade to
//! local fallbacks; generation itself never fails on a bad fetch.

use crate::character::{AbilityScores, Character, DeathSaves};
use crate::class_data::ClassProfile;
use crate::provider::{slugify, DataProvider};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

/// Skills a fresh character starts with.
const SKILL_PICKS: usize = 3;

/// Spells a fresh character starts with.
const SPELL_PICKS: usize = 4;

/// Generate a level-1 character.
///
/// Base scores are a flat 10, adjusted by race bonuses and +2 to the
/// class primary ability. Starting hp equals the class hit die and AC is
/// the class flat value. Skills and spells are random picks from the
/// provider's lists, with static fallbacks when the provider is down.
pub async fn generate_character<R: Rng>(
    name: &str,
    race: &str,
    class: &str,
    provider: &dyn DataProvider,
    rng: &mut R,
) -> Character {
    let profile = ClassProfile::for_class(class);

    let mut abilities = AbilityScores::default();
    match provider.fetch_race_bonuses(&slugify(race)).await {
        Ok(bonuses) => {
            for (ability, bonus) in bonuses {
                abilities.adjust(ability, bonus);
            }
        }
        Err(err) => warn!(race, %err, "race bonus fetch failed, using base scores"),
    }
    if let Some(primary) = profile.primary {
        abilities.adjust(primary, 2);
    }

    let skills = pick_skills(class, provider, rng).await;
    let spells = pick_spells(provider, rng).await;

    Character {
        name: name.to_string(),
        race: race.to_string(),
        class: class.to_string(),
        level: 1,
        hp: profile.hit_die as i32,
        max_hp: profile.hit_die as i32,
        ac: profile.base_ac,
        abilities,
        skills,
        spells,
        slots: profile.default_slots,
        inventory: Vec::new(),
        death_saves: DeathSaves::default(),
    }
}

async fn pick_skills<R: Rng>(
    class: &str,
    provider: &dyn DataProvider,
    rng: &mut R,
) -> Vec<String> {
    let names = match provider.list_skill_names().await {
        Ok(names) if !names.is_empty() => names,
        Ok(_) => Vec::new(),
        Err(err) => {
            warn!(%err, "skill list fetch failed, using class fallback");
            Vec::new()
        }
    };

    if names.is_empty() {
        return ClassProfile::fallback_skills(class)
            .iter()
            .take(SKILL_PICKS)
            .map(|s| s.to_string())
            .collect();
    }
    names
        .choose_multiple(rng, SKILL_PICKS.min(names.len()))
        .cloned()
        .collect()
}

async fn pick_spells<R: Rng>(provider: &dyn DataProvider, rng: &mut R) -> Vec<String> {
    let names = match provider.list_spell_names().await {
        Ok(names) => names,
        Err(err) => {
            warn!(%err, "spell list fetch failed, starting without spells");
            Vec::new()
        }
    };
    names
        .choose_multiple(rng, SPELL_PICKS.min(names.len()))
        .cloned()
        .collect()
}

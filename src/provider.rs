//! Read-only external data: races, spells, items, monsters, skill lists.
//!
//! The engine talks to a [`DataProvider`] trait object so tests can swap
//! in a canned fixture. [`Dnd5eProvider`] is the production implementation
//! over the public dnd5eapi.co REST service. Provider failures are always
//! surfaced as recoverable results, never as panics.

use crate::character::Ability;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Default base URL for the production provider.
pub const DEFAULT_API_BASE: &str = "https://www.dnd5eapi.co/api";

/// Errors from provider fetches. Absence is not an error; it is the
/// `None` side of the fetch results.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status: {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Normalize a display name into the slug the provider expects:
/// trimmed, lowercased, spaces replaced by hyphens.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Spell detail used by the casting resolver.
#[derive(Debug, Clone, Default)]
pub struct SpellDetail {
    pub name: String,
    /// 0 for cantrips; leveled spells consume a slot of this level.
    pub level: u8,
    /// Damage expression per slot level cast at.
    pub damage_at_slot_level: BTreeMap<u8, String>,
    /// Damage expression per caster level (cantrip scaling).
    pub damage_at_character_level: BTreeMap<u8, String>,
    /// Description paragraphs; the first one stands in for pure-effect spells.
    pub description: Vec<String>,
}

/// Item detail for provider-backed inventory adds.
#[derive(Debug, Clone)]
pub struct ItemDetail {
    pub name: String,
    pub description: Vec<String>,
}

/// Monster summary for lookups.
#[derive(Debug, Clone)]
pub struct MonsterDetail {
    pub name: String,
    pub hit_points: i32,
    pub armor_class: Option<i32>,
    pub challenge_rating: f64,
    pub kind: String,
    pub ability_descriptions: Vec<String>,
}

/// The read-only external data capability.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Ability bonuses for a race; empty when the race is unknown.
    async fn fetch_race_bonuses(&self, slug: &str)
        -> Result<HashMap<Ability, i32>, ProviderError>;

    async fn fetch_spell_detail(&self, slug: &str) -> Result<Option<SpellDetail>, ProviderError>;

    async fn fetch_item_detail(&self, slug: &str) -> Result<Option<ItemDetail>, ProviderError>;

    async fn fetch_monster_detail(&self, slug: &str)
        -> Result<Option<MonsterDetail>, ProviderError>;

    async fn list_skill_names(&self) -> Result<Vec<String>, ProviderError>;

    async fn list_spell_names(&self) -> Result<Vec<String>, ProviderError>;
}

// ============================================================================
// dnd5eapi.co implementation
// ============================================================================

/// HTTP provider backed by the dnd5eapi.co REST service.
pub struct Dnd5eProvider {
    client: reqwest::Client,
    base_url: String,
}

impl Dnd5eProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET a JSON document; 404 means "absent", anything else non-2xx is
    /// an error.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self.client.get(&url).send().await?;

        match response.status().as_u16() {
            200 => Ok(Some(response.json::<T>().await?)),
            404 => Ok(None),
            status => Err(ProviderError::Status(status)),
        }
    }
}

impl Default for Dnd5eProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Wire shapes for the slices of the 5e API we read.

#[derive(Debug, Deserialize)]
struct RaceWire {
    #[serde(default)]
    ability_bonuses: Vec<AbilityBonusWire>,
}

#[derive(Debug, Deserialize)]
struct AbilityBonusWire {
    ability_score: NamedWire,
    #[serde(default)]
    bonus: i32,
}

#[derive(Debug, Deserialize)]
struct NamedWire {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpellWire {
    name: String,
    #[serde(default)]
    level: u8,
    #[serde(default)]
    damage: Option<SpellDamageWire>,
    #[serde(default)]
    desc: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpellDamageWire {
    #[serde(default)]
    damage_at_slot_level: BTreeMap<String, String>,
    #[serde(default)]
    damage_at_character_level: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ItemWire {
    name: String,
    #[serde(default)]
    desc: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MonsterWire {
    name: String,
    #[serde(default)]
    hit_points: i32,
    /// The API serves this as a bare number, an object, or a list of
    /// objects depending on the monster.
    #[serde(default)]
    armor_class: serde_json::Value,
    #[serde(default)]
    challenge_rating: f64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    special_abilities: Vec<SpecialAbilityWire>,
}

#[derive(Debug, Deserialize)]
struct SpecialAbilityWire {
    #[serde(default)]
    desc: String,
}

#[derive(Debug, Deserialize)]
struct ListWire {
    #[serde(default)]
    results: Vec<NamedWire>,
}

fn ability_from_api_name(name: &str) -> Option<Ability> {
    match name {
        "Strength" | "STR" => Some(Ability::Strength),
        "Dexterity" | "DEX" => Some(Ability::Dexterity),
        "Constitution" | "CON" => Some(Ability::Constitution),
        "Intelligence" | "INT" => Some(Ability::Intelligence),
        "Wisdom" | "WIS" => Some(Ability::Wisdom),
        "Charisma" | "CHA" => Some(Ability::Charisma),
        _ => None,
    }
}

fn parse_level_keys(map: BTreeMap<String, String>) -> BTreeMap<u8, String> {
    map.into_iter()
        .filter_map(|(k, v)| k.parse::<u8>().ok().map(|level| (level, v)))
        .collect()
}

fn parse_armor_class(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(|v| v as i32),
        serde_json::Value::Object(obj) => obj.get("value").and_then(|v| v.as_i64()).map(|v| v as i32),
        serde_json::Value::Array(items) => items.first().and_then(parse_armor_class),
        _ => None,
    }
}

impl From<SpellWire> for SpellDetail {
    fn from(wire: SpellWire) -> Self {
        let (by_slot, by_level) = match wire.damage {
            Some(damage) => (
                parse_level_keys(damage.damage_at_slot_level),
                parse_level_keys(damage.damage_at_character_level),
            ),
            None => (BTreeMap::new(), BTreeMap::new()),
        };
        SpellDetail {
            name: wire.name,
            level: wire.level,
            damage_at_slot_level: by_slot,
            damage_at_character_level: by_level,
            description: wire.desc,
        }
    }
}

#[async_trait]
impl DataProvider for Dnd5eProvider {
    async fn fetch_race_bonuses(
        &self,
        slug: &str,
    ) -> Result<HashMap<Ability, i32>, ProviderError> {
        let Some(race) = self.get_json::<RaceWire>(&format!("races/{slug}")).await? else {
            return Ok(HashMap::new());
        };

        let mut bonuses = HashMap::new();
        for entry in race.ability_bonuses {
            if let Some(ability) = ability_from_api_name(&entry.ability_score.name) {
                *bonuses.entry(ability).or_insert(0) += entry.bonus;
            }
        }
        Ok(bonuses)
    }

    async fn fetch_spell_detail(&self, slug: &str) -> Result<Option<SpellDetail>, ProviderError> {
        let wire = self.get_json::<SpellWire>(&format!("spells/{slug}")).await?;
        Ok(wire.map(SpellDetail::from))
    }

    async fn fetch_item_detail(&self, slug: &str) -> Result<Option<ItemDetail>, ProviderError> {
        let wire = self.get_json::<ItemWire>(&format!("equipment/{slug}")).await?;
        Ok(wire.map(|w| ItemDetail {
            name: w.name,
            description: w.desc,
        }))
    }

    async fn fetch_monster_detail(
        &self,
        slug: &str,
    ) -> Result<Option<MonsterDetail>, ProviderError> {
        let wire = self
            .get_json::<MonsterWire>(&format!("monsters/{slug}"))
            .await?;
        Ok(wire.map(|w| MonsterDetail {
            armor_class: parse_armor_class(&w.armor_class),
            name: w.name,
            hit_points: w.hit_points,
            challenge_rating: w.challenge_rating,
            kind: w.kind,
            ability_descriptions: w.special_abilities.into_iter().map(|a| a.desc).collect(),
        }))
    }

    async fn list_skill_names(&self) -> Result<Vec<String>, ProviderError> {
        let list = self.get_json::<ListWire>("skills").await?.unwrap_or(ListWire {
            results: Vec::new(),
        });
        Ok(list.results.into_iter().map(|r| r.name).collect())
    }

    async fn list_spell_names(&self) -> Result<Vec<String>, ProviderError> {
        let list = self.get_json::<ListWire>("spells").await?.unwrap_or(ListWire {
            results: Vec::new(),
        });
        Ok(list.results.into_iter().map(|r| r.name).collect())
    }
}

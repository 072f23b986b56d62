//! Canned provider fixture for tests and offline play.

use crate::character::Ability;
use crate::provider::{
    DataProvider, ItemDetail, MonsterDetail, ProviderError, SpellDetail,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// An in-memory [`DataProvider`] with fixed content, keyed by slug.
#[derive(Default)]
pub struct StaticProvider {
    races: HashMap<String, HashMap<Ability, i32>>,
    spells: HashMap<String, SpellDetail>,
    items: HashMap<String, ItemDetail>,
    monsters: HashMap<String, MonsterDetail>,
    skill_names: Vec<String>,
    spell_names: Vec<String>,
    /// When set, every fetch fails with this message.
    unreachable: Option<String>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_race_bonus(mut self, slug: &str, ability: Ability, bonus: i32) -> Self {
        *self
            .races
            .entry(slug.to_string())
            .or_default()
            .entry(ability)
            .or_insert(0) += bonus;
        self
    }

    pub fn with_spell(mut self, slug: &str, detail: SpellDetail) -> Self {
        self.spells.insert(slug.to_string(), detail);
        self
    }

    pub fn with_item(mut self, slug: &str, detail: ItemDetail) -> Self {
        self.items.insert(slug.to_string(), detail);
        self
    }

    pub fn with_monster(mut self, slug: &str, detail: MonsterDetail) -> Self {
        self.monsters.insert(slug.to_string(), detail);
        self
    }

    pub fn with_skills<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skill_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_spell_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spell_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Make every fetch fail, for exercising provider-down paths.
    pub fn unreachable(mut self, message: &str) -> Self {
        self.unreachable = Some(message.to_string());
        self
    }

    fn check_reachable(&self) -> Result<(), ProviderError> {
        match &self.unreachable {
            Some(message) => Err(ProviderError::Decode(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataProvider for StaticProvider {
    async fn fetch_race_bonuses(
        &self,
        slug: &str,
    ) -> Result<HashMap<Ability, i32>, ProviderError> {
        self.check_reachable()?;
        Ok(self.races.get(slug).cloned().unwrap_or_default())
    }

    async fn fetch_spell_detail(&self, slug: &str) -> Result<Option<SpellDetail>, ProviderError> {
        self.check_reachable()?;
        Ok(self.spells.get(slug).cloned())
    }

    async fn fetch_item_detail(&self, slug: &str) -> Result<Option<ItemDetail>, ProviderError> {
        self.check_reachable()?;
        Ok(self.items.get(slug).cloned())
    }

    async fn fetch_monster_detail(
        &self,
        slug: &str,
    ) -> Result<Option<MonsterDetail>, ProviderError> {
        self.check_reachable()?;
        Ok(self.monsters.get(slug).cloned())
    }

    async fn list_skill_names(&self) -> Result<Vec<String>, ProviderError> {
        self.check_reachable()?;
        Ok(self.skill_names.clone())
    }

    async fn list_spell_names(&self) -> Result<Vec<String>, ProviderError> {
        self.check_reachable()?;
        Ok(self.spell_names.clone())
    }
}

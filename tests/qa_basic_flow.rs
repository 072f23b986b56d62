//! QA tests for the character lifecycle: creation, leveling, casting,
//! inventory, and death saves, driven through the GameSession API.

use guildhall::character::DeathSaveOutcome;
use guildhall::provider::{ItemDetail, SpellDetail};
use guildhall::testing::StaticProvider;
use guildhall::{Ability, GameError, GameSession, GuildId, SessionStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

fn provider() -> StaticProvider {
    StaticProvider::new()
        .with_race_bonus("elf", Ability::Dexterity, 2)
        .with_skills(["Arcana", "History", "Stealth"])
        .with_spell_names(["Magic Missile", "Shield", "Fire Bolt", "Light"])
        .with_spell(
            "magic-missile",
            SpellDetail {
                name: "Magic Missile".to_string(),
                level: 1,
                damage_at_slot_level: BTreeMap::from([
                    (1, "3d4+3".to_string()),
                    (2, "4d4+4".to_string()),
                ]),
                damage_at_character_level: BTreeMap::new(),
                description: vec!["Three glowing darts.".to_string()],
            },
        )
        .with_spell(
            "shield",
            SpellDetail {
                name: "Shield".to_string(),
                level: 1,
                damage_at_slot_level: BTreeMap::new(),
                damage_at_character_level: BTreeMap::new(),
                description: vec!["An invisible barrier appears.".to_string()],
            },
        )
        .with_spell(
            "fire-bolt",
            SpellDetail {
                name: "Fire Bolt".to_string(),
                level: 0,
                damage_at_slot_level: BTreeMap::new(),
                damage_at_character_level: BTreeMap::from([(1, "1d10".to_string())]),
                description: vec!["A mote of fire.".to_string()],
            },
        )
        .with_item(
            "torch",
            ItemDetail {
                name: "Torch".to_string(),
                description: vec!["Burns for 1 hour.".to_string()],
            },
        )
}

async fn setup(dir: &TempDir) -> (GameSession, GuildId) {
    let store = Arc::new(SessionStore::open(dir.path().join("data.json")).await);
    let session = GameSession::with_rng(
        store,
        Arc::new(provider()),
        StdRng::seed_from_u64(2024),
    );
    (session, GuildId::from("guild-1"))
}

// =============================================================================
// Character creation and status
// =============================================================================

#[tokio::test]
async fn test_create_and_status() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;

    let created = session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();
    assert_eq!(created.level, 1);
    assert_eq!(created.abilities.dexterity, 12);
    assert_eq!(created.slots.get(&1), Some(&2));
    // Exactly the provider's lists get picked when they are this short.
    assert_eq!(created.skills.len(), 3);
    assert_eq!(created.spells.len(), 4);

    // Lookup is case-insensitive.
    let fetched = session.character(&guild, "MIRA").await.unwrap();
    assert_eq!(fetched, created);

    assert!(matches!(
        session.character(&guild, "Nobody").await,
        Err(GameError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_characters_are_guild_scoped() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    let other = GuildId::from("guild-2");
    assert!(session.character(&other, "Mira").await.is_err());
}

// =============================================================================
// Leveling and rest
// =============================================================================

#[tokio::test]
async fn test_level_up_full_heal_and_slot_growth() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    session.damage_character(&guild, "Mira", 3).await.unwrap();
    let report = session.level_up(&guild, "Mira").await.unwrap();
    assert_eq!(report.new_level, 2);
    assert!(report.hp_gain >= 1);

    let mira = session.character(&guild, "Mira").await.unwrap();
    assert_eq!(mira.hp, mira.max_hp);
    assert_eq!(mira.max_hp, 6 + report.hp_gain);
    // Wizards gain a flat extra level-1 slot.
    assert_eq!(mira.slots.get(&1), Some(&3));
}

#[tokio::test]
async fn test_long_rest_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    session.damage_character(&guild, "Mira", 4).await.unwrap();
    session
        .cast(&guild, "Mira", "Magic Missile", None)
        .await
        .unwrap();

    let rested = session.long_rest(&guild, "Mira").await.unwrap();
    assert_eq!(rested.hp, rested.max_hp);
    assert_eq!(rested.slots.get(&1), Some(&2));
}

// =============================================================================
// Spell casting
// =============================================================================

#[tokio::test]
async fn test_cast_consumes_slots_until_exhausted() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    for _ in 0..2 {
        let outcome = session
            .cast(&guild, "Mira", "magic missile", None)
            .await
            .unwrap();
        assert_eq!(outcome.slot_spent, Some(1));
        let damage = outcome.damage.unwrap();
        assert_eq!(damage.rolls.len(), 3);
        assert_eq!(
            damage.total,
            damage.rolls.iter().map(|&r| r as i32).sum::<i32>() + 3
        );
    }

    assert!(matches!(
        session.cast(&guild, "Mira", "Magic Missile", None).await,
        Err(GameError::InsufficientResource { level: 1 })
    ));
}

#[tokio::test]
async fn test_cast_at_requested_slot_level() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    // Casting at slot 2 picks that table entry; the slot spent is still
    // the spell's own level.
    let outcome = session
        .cast(&guild, "Mira", "Magic Missile", Some(2))
        .await
        .unwrap();
    assert_eq!(outcome.damage.as_ref().unwrap().rolls.len(), 4);
    assert_eq!(outcome.slot_spent, Some(1));

    // The chat form carries the slot as a trailing argument.
    let command = guildhall::Command::parse("cast Mira magic missile 2").unwrap();
    let reply = guildhall::dispatch(&session, &guild, command).await.unwrap();
    assert!(reply.contains("casts Magic Missile"));
}

#[tokio::test]
async fn test_cast_cantrip_and_pure_effect() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    let bolt = session.cast(&guild, "Mira", "Fire Bolt", None).await.unwrap();
    assert_eq!(bolt.slot_spent, None);
    assert_eq!(bolt.damage.as_ref().unwrap().rolls.len(), 1);

    let shield = session.cast(&guild, "Mira", "Shield", None).await.unwrap();
    assert_eq!(shield.slot_spent, Some(1));
    assert!(shield.damage.is_none());
    assert_eq!(
        shield.description.as_deref(),
        Some("An invisible barrier appears.")
    );
}

#[tokio::test]
async fn test_cast_failure_modes() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    // Unknown to the character.
    assert!(matches!(
        session.cast(&guild, "Mira", "Wish", None).await,
        Err(GameError::NotFound { .. })
    ));

    // Known to the character but the provider serves nothing for it.
    assert!(matches!(
        session.cast(&guild, "Mira", "Light", None).await,
        Err(GameError::ProviderUnavailable(_))
    ));

    // Provider failure never consumed a slot.
    let mira = session.character(&guild, "Mira").await.unwrap();
    assert_eq!(mira.slots.get(&1), Some(&2));
}

// =============================================================================
// Inventory
// =============================================================================

#[tokio::test]
async fn test_inventory_lifecycle() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    session.inventory_add(&guild, "Mira", "Rope").await.unwrap();
    let torch = session
        .inventory_add_from_provider(&guild, "Mira", "Torch")
        .await
        .unwrap();
    assert_eq!(torch.description.len(), 1);

    let items = session.inventory(&guild, "Mira").await.unwrap();
    assert_eq!(items.len(), 2);

    let removed = session.inventory_remove(&guild, "Mira", "rope").await.unwrap();
    assert_eq!(removed.name, "Rope");
    assert_eq!(session.inventory(&guild, "Mira").await.unwrap().len(), 1);

    assert!(matches!(
        session.inventory_remove(&guild, "Mira", "Rope").await,
        Err(GameError::NotFound { .. })
    ));
    assert!(matches!(
        session
            .inventory_add_from_provider(&guild, "Mira", "Vorpal Sword")
            .await,
        Err(GameError::NotFound { .. })
    ));
}

// =============================================================================
// Death saves
// =============================================================================

#[tokio::test]
async fn test_death_save_requires_downed_character() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    assert!(matches!(
        session.death_save(&guild, "Mira").await,
        Err(GameError::StateConflict(_))
    ));
}

#[tokio::test]
async fn test_death_save_sequence_matches_transition_table() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();
    session.damage_character(&guild, "Mira", 50).await.unwrap();

    let mut successes: u8 = 0;
    let mut failures: u8 = 0;
    for _ in 0..64 {
        let report = session.death_save(&guild, "Mira").await.unwrap();
        match report.roll {
            20 => {
                assert_eq!(report.outcome, DeathSaveOutcome::Revived);
                let mira = session.character(&guild, "Mira").await.unwrap();
                assert_eq!(mira.hp, 1);
                assert_eq!(mira.death_saves.successes, 0);
                assert_eq!(mira.death_saves.failures, 0);
                return;
            }
            1 => failures += 2,
            10..=19 => successes += 1,
            _ => failures += 1,
        }

        if failures >= 3 {
            assert_eq!(report.outcome, DeathSaveOutcome::Dead);
            assert!(matches!(
                session.character(&guild, "Mira").await,
                Err(GameError::NotFound { .. })
            ));
            return;
        }
        if successes >= 3 {
            assert_eq!(report.outcome, DeathSaveOutcome::Stabilized);
            let mira = session.character(&guild, "Mira").await.unwrap();
            assert!(mira.hp <= 0);
            assert_eq!(mira.death_saves.successes, 0);
            return;
        }
        assert_eq!(
            report.outcome,
            DeathSaveOutcome::Dying {
                successes,
                failures
            }
        );
    }
    panic!("death save sequence did not terminate in 64 rolls");
}

// =============================================================================
// Skill checks
// =============================================================================

#[tokio::test]
async fn test_skill_check_bonus_only_for_known_skills() {
    let dir = TempDir::new().unwrap();
    let (session, guild) = setup(&dir).await;
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();

    // The provider served exactly three skills, so Mira knows them all.
    let known = session.skill_check(&guild, "Mira", "Arcana").await.unwrap();
    assert_eq!(known.bonus, 2);
    assert_eq!(known.total, known.die as i32 + 2);

    let unknown = session
        .skill_check(&guild, "Mira", "Basket Weaving")
        .await
        .unwrap();
    assert_eq!(unknown.bonus, 0);
}

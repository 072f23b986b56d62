//! QA tests for persistence: every mutation lands on disk, and a fresh
//! process sees exactly the state the previous one left behind.

use guildhall::provider::SpellDetail;
use guildhall::testing::StaticProvider;
use guildhall::{GameSession, GuildId, SessionStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn provider() -> StaticProvider {
    StaticProvider::new()
        .with_skills(["Arcana", "History", "Stealth"])
        .with_spell_names(["Magic Missile"])
        .with_spell(
            "magic-missile",
            SpellDetail {
                name: "Magic Missile".to_string(),
                level: 1,
                damage_at_slot_level: BTreeMap::from([(1, "3d4+3".to_string())]),
                damage_at_character_level: BTreeMap::new(),
                description: vec!["Three glowing darts.".to_string()],
            },
        )
}

async fn session_at(path: &Path) -> GameSession {
    let store = Arc::new(SessionStore::open(path).await);
    GameSession::with_rng(store, Arc::new(provider()), StdRng::seed_from_u64(42))
}

/// Drive a session through a bit of everything and return the guild id.
async fn play(session: &GameSession) -> GuildId {
    let guild = GuildId::from("1234");
    session
        .create_character(&guild, "Mira", "Elf", "Wizard")
        .await
        .unwrap();
    session.cast(&guild, "Mira", "Magic Missile", None).await.unwrap();
    session.inventory_add(&guild, "Mira", "Rope").await.unwrap();
    session.damage_character(&guild, "Mira", 2).await.unwrap();

    session.start_encounter(&guild).await.unwrap();
    session.add_combatant(&guild, "Mira", 6, 14, Some(12)).await.unwrap();
    session.add_combatant(&guild, "Wolf", 11, 12, None).await.unwrap();
    session.add_effect(&guild, "Wolf", "prone").await.unwrap();
    session.next_turn(&guild).await.unwrap();
    guild
}

#[tokio::test]
async fn test_fresh_process_sees_previous_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");

    let first = session_at(&path).await;
    let guild = play(&first).await;
    let mira_before = first.character(&guild, "Mira").await.unwrap();
    let encounter_before = first.encounter(&guild).await.unwrap();
    drop(first);

    let second = session_at(&path).await;
    let mira_after = second.character(&guild, "Mira").await.unwrap();
    assert_eq!(mira_after, mira_before);
    // The consumed slot, damage, and inventory all survived.
    assert_eq!(mira_after.slots.get(&1), Some(&1));
    assert_eq!(mira_after.hp, mira_after.max_hp - 2);
    assert_eq!(mira_after.inventory.len(), 1);

    let encounter_after = second.encounter(&guild).await.unwrap();
    assert_eq!(encounter_after, encounter_before);
    // Turn pointer and effects included.
    assert_eq!(encounter_after.turn, 1);
    assert_eq!(encounter_after.find("Wolf").unwrap().effects, vec!["prone"]);
}

#[tokio::test]
async fn test_reloaded_session_keeps_playing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");

    let first = session_at(&path).await;
    let guild = play(&first).await;
    drop(first);

    // Resume mid-encounter: the second slot is still there to spend, and
    // the turn rotation continues from where the first process stopped.
    let second = session_at(&path).await;
    let outcome = second.cast(&guild, "Mira", "Magic Missile", None).await.unwrap();
    assert_eq!(outcome.slot_spent, Some(1));
    assert!(second
        .cast(&guild, "Mira", "Magic Missile", None)
        .await
        .is_err());

    let current = second.next_turn(&guild).await.unwrap();
    assert_eq!(current.name, "Mira");
}

#[tokio::test]
async fn test_data_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");

    let session = session_at(&path).await;
    play(&session).await;

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let data: Value = serde_json::from_str(&content).unwrap();

    // Two top-level maps, both keyed by guild id.
    let characters = data["characters"]["1234"].as_object().unwrap();
    assert!(characters.contains_key("mira"));
    let mira = &characters["mira"];
    assert_eq!(mira["name"], "Mira");
    // Slot levels serialize as string keys in JSON maps.
    assert_eq!(mira["slots"]["1"], 1);

    let combat = &data["combats"]["1234"];
    assert_eq!(combat["turn"], 1);
    let order = combat["order"].as_array().unwrap();
    assert_eq!(order.len(), 2);
    assert_eq!(order[0]["name"], "Mira");
    assert_eq!(order[1]["effects"][0], "prone");
}

#[tokio::test]
async fn test_guilds_do_not_leak_across_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");

    let first = session_at(&path).await;
    play(&first).await;
    first
        .create_character(&GuildId::from("5678"), "Borric", "Human", "Fighter")
        .await
        .unwrap();
    drop(first);

    let second = session_at(&path).await;
    assert!(second.character(&GuildId::from("1234"), "Mira").await.is_ok());
    assert!(second.character(&GuildId::from("5678"), "Borric").await.is_ok());
    assert!(second.character(&GuildId::from("1234"), "Borric").await.is_err());
    assert!(second.encounter(&GuildId::from("5678")).await.is_err());
}

#[tokio::test]
async fn test_ended_encounter_is_removed_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");

    let session = session_at(&path).await;
    let guild = play(&session).await;
    session.end_encounter(&guild).await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let data: Value = serde_json::from_str(&content).unwrap();
    assert!(data["combats"].as_object().unwrap().is_empty());
    // Characters are untouched by the encounter ending.
    assert!(data["characters"]["1234"].as_object().unwrap().contains_key("mira"));
}

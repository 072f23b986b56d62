//! Guild-scoped D&D 5e combat and character engine.
//!
//! This crate provides:
//! - A dice engine with injectable randomness
//! - Character resources: HP, spell slots, leveling, death saves
//! - An encounter tracker with initiative order and turn rotation
//! - Spell casting backed by an external data provider
//! - A per-guild session store persisted after every mutation
//!
//! # Quick Start
//!
//! ```ignore
//! use guildhall::{Dnd5eProvider, GameSession, GuildId, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SessionStore::open("guildhall.json").await);
//!     let session = GameSession::new(store, Arc::new(Dnd5eProvider::new()));
//!
//!     let guild = GuildId::from("1234");
//!     let mira = session.create_character(&guild, "Mira", "Elf", "Wizard").await?;
//!     println!("{} the {} is ready", mira.name, mira.class);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod casting;
pub mod character;
pub mod class_data;
pub mod commands;
pub mod dice;
pub mod encounter;
pub mod error;
pub mod provider;
pub mod session;
pub mod store;
pub mod testing;

// Primary public API
pub use character::{Ability, AbilityScores, Character, DeathSaveOutcome, DeathSaves, ItemRef};
pub use commands::{dispatch, Command};
pub use dice::{DiceError, DiceExpression, RollResult};
pub use encounter::{Combatant, Encounter};
pub use error::GameError;
pub use provider::{DataProvider, Dnd5eProvider, MonsterDetail, SpellDetail};
pub use session::GameSession;
pub use store::{GuildId, SessionStore};

//! Shared error taxonomy for game operations.
//!
//! Every operation in the engine reports failures through [`GameError`].
//! All variants are recoverable: they are rendered back to the caller as
//! a reply and never terminate the hosting process.

use crate::dice::DiceError;
use thiserror::Error;

/// Errors from core game operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// A named entity (character, combatant, spell, item, monster) is absent.
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    /// Malformed or out-of-range caller input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No spell slot remaining at the required level.
    #[error("no level {level} spell slot remaining")]
    InsufficientResource { level: u8 },

    /// The external data provider failed or returned nothing usable.
    #[error("data provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The operation's preconditions are not met in the current state.
    #[error("{0}")]
    StateConflict(String),
}

impl GameError {
    /// Shorthand for a [`GameError::NotFound`] with an owned name.
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        GameError::NotFound {
            what,
            name: name.into(),
        }
    }
}

impl From<DiceError> for GameError {
    fn from(err: DiceError) -> Self {
        GameError::InvalidInput(err.to_string())
    }
}

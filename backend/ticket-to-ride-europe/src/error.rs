use crate::card::TrainColor;

use thiserror::Error;

/// Failures of the train card piles.
///
/// Neither is fatal: an exhausted deck simply means that no card can be handed out this time.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum DeckError {
    /// Both the close deck and the discarded deck are empty.
    #[error("There are no train cards left in the close deck nor in the discarded deck.")]
    Exhausted,
    /// The requested color is not part of the open deck.
    #[error("There is no {0} train card in the open deck.")]
    NotDisplayed(TrainColor),
}

/// Rejected session or board setup.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    #[error("Cannot create a game with {0} players: one must have at least two, and at most 5 players.")]
    PlayerCount(usize),
    #[error("Cannot have two players named `{0}`.")]
    DuplicateName(String),
    #[error("Invalid rule `{field}`: {reason}")]
    InvalidRule { field: &'static str, reason: String },
    #[error("Invalid route between {start} and {end}: {reason}")]
    InvalidRoute {
        start: String,
        end: String,
        reason: String,
    },
}

/// Errors that stop the engine from carrying on with a session.
///
/// Rule violations during a turn are *not* errors: the action is declined, staged cards are
/// returned to the hand and the player is asked to choose again.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The decision stream was closed while the engine was waiting for a choice.
    #[error("The decision stream was closed while waiting for a choice.")]
    Disconnected,
    #[error("The game is over, no more turns can be played.")]
    GameOver,
}

//! Derived game status.

use serde::{Deserialize, Serialize};

/// What the game is doing, derived every fusion cycle.
///
/// Never stored independently of the facts it is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// No game is running (or the server is unreachable).
    #[default]
    Setup,
    /// A game is running.
    Playing,
    /// A game is running but the scenario clock is stopped.
    Paused,
    /// The player faction won.
    GameOverVictory,
    /// Another faction won.
    GameOverDefeat,
}

impl GameStatus {
    /// The status as the snake-case string shown to the platform.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::GameOverVictory => "game_over_victory",
            Self::GameOverDefeat => "game_over_defeat",
        }
    }

    /// Whether the game has ended.
    pub const fn is_game_over(self) -> bool {
        matches!(self, Self::GameOverVictory | Self::GameOverDefeat)
    }
}

impl core::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

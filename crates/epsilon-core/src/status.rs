//! Game status derivation.

use epsilon_types::{GameFacts, GameStatus};

/// Derive the status from one cycle's facts.
///
/// Precedence: no game means setup; a victory faction means game over
/// (a win when it contains `victory_keyword`, case-insensitively); then
/// paused; otherwise playing.
pub fn derive_status(facts: &GameFacts, victory_keyword: &str) -> GameStatus {
    if !facts.has_game {
        return GameStatus::Setup;
    }
    if let Some(faction) = &facts.victory_faction {
        let keyword = victory_keyword.to_lowercase();
        return if faction.to_lowercase().contains(&keyword) {
            GameStatus::GameOverVictory
        } else {
            GameStatus::GameOverDefeat
        };
    }
    if facts.paused {
        GameStatus::Paused
    } else {
        GameStatus::Playing
    }
}

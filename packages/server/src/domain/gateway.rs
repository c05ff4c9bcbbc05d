//! External game-data gateway seam.
//!
//! The quiz content and the final standings live in an external service. The
//! coordinator reads a game's question set once per start and writes the
//! results once per finished game.

use async_trait::async_trait;

use super::{
    entity::{LeaderboardEntry, Question},
    error::GatewayError,
    value_object::{GameId, LobbyCode, Timestamp},
};

/// A playable game: its ordered, validated question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDefinition {
    pub game_id: GameId,
    pub title: Option<String>,
    pub questions: Vec<Question>,
}

/// Final standings of one lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResults {
    pub game_id: GameId,
    pub lobby_code: LobbyCode,
    pub finished_at: Timestamp,
    pub total_questions: usize,
    pub standings: Vec<LeaderboardEntry>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameGateway: Send + Sync {
    /// Fetch the question set of `game_id`.
    async fn fetch_game(&self, game_id: &GameId) -> Result<GameDefinition, GatewayError>;

    /// Persist the final standings of a lobby.
    async fn save_results(&self, results: &GameResults) -> Result<(), GatewayError>;
}

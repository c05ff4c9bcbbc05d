//! HTTP API response DTOs for the quiz lobby.

use serde::{Deserialize, Serialize};

/// Lobby summary for list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySummaryDto {
    pub lobby_key: String,
    pub game_id: String,
    pub lobby_code: String,
    pub state: String,
    pub players: Vec<String>,
    pub max_players: usize,
    pub created_at: String, // ISO 8601
}

/// Lobby detail for detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyDetailDto {
    pub lobby_key: String,
    pub game_id: String,
    pub lobby_code: String,
    pub state: String,
    pub current_question_index: Option<usize>,
    pub total_questions: usize,
    pub settings: LobbySettingsDto,
    pub players: Vec<PlayerDetailDto>,
    pub created_at: String,       // ISO 8601
    pub last_activity_at: String, // ISO 8601
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySettingsDto {
    pub max_players: usize,
    pub time_per_question_secs: u32,
    pub show_correct_answers: bool,
}

/// Player detail for lobby detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDetailDto {
    pub player_id: String,
    pub display_name: String,
    pub is_host: bool,
    pub ready: bool,
    pub score: u32,
    pub joined_at: String, // ISO 8601
}

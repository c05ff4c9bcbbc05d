//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use quiz_lobby_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::{GameId, Lobby, LobbyCode, LobbyKey},
    infrastructure::dto::http::{LobbyDetailDto, LobbySettingsDto, LobbySummaryDto, PlayerDetailDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of lobbies
pub async fn get_lobbies(State(state): State<Arc<AppState>>) -> Json<Vec<LobbySummaryDto>> {
    let mut summaries = Vec::new();
    for handle in state.context.repository.list().await {
        let lobby = handle.lock().await;
        if lobby.is_closed() {
            continue;
        }
        summaries.push(summary(&lobby));
    }
    summaries.sort_by(|a, b| a.lobby_key.cmp(&b.lobby_key));
    Json(summaries)
}

/// Get lobby detail by game id and lobby code
pub async fn get_lobby_detail(
    State(state): State<Arc<AppState>>,
    Path((game_id, lobby_code)): Path<(String, String)>,
) -> Result<Json<LobbyDetailDto>, StatusCode> {
    // Malformed ids cannot name an existing lobby
    let lobby_key = match (GameId::new(game_id), LobbyCode::new(lobby_code)) {
        (Ok(game_id), Ok(lobby_code)) => LobbyKey::new(game_id, lobby_code),
        _ => return Err(StatusCode::NOT_FOUND),
    };

    let handle = state
        .context
        .repository
        .find(&lobby_key)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let lobby = handle.lock().await;
    if lobby.is_closed() {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(detail(&lobby)))
}

fn summary(lobby: &Lobby) -> LobbySummaryDto {
    LobbySummaryDto {
        lobby_key: lobby.key().to_string(),
        game_id: lobby.key().game_id().to_string(),
        lobby_code: lobby.key().lobby_code().to_string(),
        state: lobby.state().to_string(),
        players: lobby
            .players()
            .iter()
            .map(|p| p.id.as_str().to_string())
            .collect(),
        max_players: lobby.settings().max_players,
        created_at: timestamp_to_jst_rfc3339(lobby.created_at().value()),
    }
}

fn detail(lobby: &Lobby) -> LobbyDetailDto {
    let settings = lobby.settings();
    LobbyDetailDto {
        lobby_key: lobby.key().to_string(),
        game_id: lobby.key().game_id().to_string(),
        lobby_code: lobby.key().lobby_code().to_string(),
        state: lobby.state().to_string(),
        current_question_index: lobby
            .state()
            .is_in_game()
            .then_some(lobby.current_question_index()),
        total_questions: lobby.total_questions(),
        settings: LobbySettingsDto {
            max_players: settings.max_players,
            time_per_question_secs: settings.time_per_question_secs,
            show_correct_answers: settings.show_correct_answers,
        },
        players: lobby
            .players()
            .iter()
            .map(|p| PlayerDetailDto {
                player_id: p.id.as_str().to_string(),
                display_name: p.display_name.as_str().to_string(),
                is_host: p.is_host,
                ready: p.ready,
                score: p.score,
                joined_at: timestamp_to_jst_rfc3339(p.joined_at.value()),
            })
            .collect(),
        created_at: timestamp_to_jst_rfc3339(lobby.created_at().value()),
        last_activity_at: timestamp_to_jst_rfc3339(lobby.last_activity_at().value()),
    }
}

//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, DisplayName, GameId, LobbyCode, LobbyKey, PlayerId,
        PlayerIdFactory, SettingsPatch,
    },
    infrastructure::dto::websocket::{
        ActionErrorPayload, ClientEvent, ErrorPayload, JoinLobbyPayload, LobbyRefPayload,
        ServerEvent,
    },
    ui::state::{AppState, ConnectQuery},
    usecase::{
        AdvanceQuestionUseCase, AnswerSubmission, CloseQuestionUseCase, DisconnectPlayerUseCase,
        FinishGameUseCase, JoinLobbyUseCase, JoinRequest, KickPlayerUseCase, LeaderboardView,
        PlayersListUseCase, SessionContext, SetReadyUseCase, ShowResultsUseCase,
        StartGameUseCase, SubmitAnswerUseCase, UpdateSettingsUseCase, UseCaseError,
    },
};

/// Display name used when neither the join nor the connect query has one
const FALLBACK_DISPLAY_NAME: &str = "Guest";

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: ConnectQuery) {
    let connection_id = match ConnectionIdFactory::generate() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to mint a connection id: {}", e);
            return;
        }
    };

    // Create a channel for this connection to receive events
    let (tx, mut rx) = mpsc::unbounded_channel();
    let context = state.context.clone();
    context
        .connections
        .register(connection_id.clone(), tx)
        .await;
    tracing::info!(
        "Connection '{}' opened (user_id: {:?}, username: {:?})",
        connection_id,
        query.user_id,
        query.username
    );

    let (mut sender, mut receiver) = socket.split();

    // Spawn a task to receive frames from this client
    let recv_connection = connection_id.clone();
    let recv_context = context.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", recv_connection, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_frame(&recv_context, &recv_connection, &query, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", recv_connection);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to forward queued events to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // The leave runs after the reconnect grace period, detached from this socket
    DisconnectPlayerUseCase::new(context).execute(connection_id);
}

/// Parse and dispatch one text frame; every failure is answered to this connection only
async fn handle_frame(
    context: &SessionContext,
    connection_id: &ConnectionId,
    query: &ConnectQuery,
    text: &str,
) {
    let mut value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Malformed frame from '{}': {}", connection_id, e);
            reply_error(context, connection_id, "unknown", &UseCaseError::Validation(e.to_string()))
                .await;
            return;
        }
    };
    let action = value
        .get("event")
        .and_then(|e| e.as_str())
        .unwrap_or("unknown")
        .to_string();
    // payload-less commands may omit `data`
    if let Some(frame) = value.as_object_mut() {
        frame
            .entry("data")
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    }

    let event = match ClientEvent::deserialize(value) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Invalid '{}' frame from '{}': {}", action, connection_id, e);
            reply_error(context, connection_id, &action, &UseCaseError::Validation(e.to_string()))
                .await;
            return;
        }
    };
    tracing::debug!("Received '{}' from '{}'", event.name(), connection_id);

    if let Err(e) = dispatch(context, connection_id, query, event).await {
        if e.is_silent() {
            tracing::warn!("Ignoring '{}' from '{}': {}", action, connection_id, e);
            return;
        }
        tracing::info!("'{}' from '{}' failed: {}", action, connection_id, e);
        reply_error(context, connection_id, &action, &e).await;
    }
}

async fn dispatch(
    context: &SessionContext,
    connection_id: &ConnectionId,
    query: &ConnectQuery,
    event: ClientEvent,
) -> Result<(), UseCaseError> {
    match event {
        ClientEvent::JoinLobby(payload) => {
            let request = join_request(payload, query)?;
            JoinLobbyUseCase::new(context.clone())
                .execute(connection_id, request)
                .await?;
        }
        ClientEvent::JoinGameSession(payload) => {
            let request = join_request(payload, query)?;
            JoinLobbyUseCase::new(context.clone())
                .rejoin(connection_id, request)
                .await?;
        }
        ClientEvent::StartGame(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            StartGameUseCase::new(context.clone())
                .execute(
                    &lobby_key,
                    connection_id,
                    payload.game_settings.map(SettingsPatch::from),
                )
                .await?;
        }
        ClientEvent::KickPlayer(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            let target = PlayerId::new(payload.player_id_to_kick)?;
            KickPlayerUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, &target)
                .await?;
        }
        ClientEvent::UpdateGameSettings(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            UpdateSettingsUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, SettingsPatch::from(payload.settings))
                .await?;
        }
        ClientEvent::PlayerAnswer(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            let submission = AnswerSubmission {
                player_id: payload.player_id.map(PlayerId::new).transpose()?,
                question_index: payload.question_index,
                choice_index: payload.answer,
                time_left: payload.time_left.map(|secs| secs.max(0.0).round() as u32),
            };
            SubmitAnswerUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, submission)
                .await?;
        }
        ClientEvent::NextQuestionCommand(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            AdvanceQuestionUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, payload.question_index)
                .await?;
        }
        ClientEvent::ShowAnswerStats(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            ShowResultsUseCase::new(context.clone())
                .show_answer_stats(&lobby_key, connection_id, payload.question_index)
                .await?;
        }
        ClientEvent::ShowLeaderboardCommand(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            ShowResultsUseCase::new(context.clone())
                .show_leaderboard(
                    &lobby_key,
                    connection_id,
                    payload.question_index,
                    LeaderboardView::Leaderboard,
                )
                .await?;
        }
        ClientEvent::ShowClassificationCommand(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            ShowResultsUseCase::new(context.clone())
                .show_leaderboard(
                    &lobby_key,
                    connection_id,
                    payload.question_index,
                    LeaderboardView::Classification,
                )
                .await?;
        }
        ClientEvent::TimeUp(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            CloseQuestionUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, payload.question_index)
                .await?;
        }
        ClientEvent::RequestPlayersList(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload).await?;
            PlayersListUseCase::new(context.clone())
                .execute(&lobby_key, connection_id)
                .await?;
        }
        ClientEvent::GameFinishedCommand(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload).await?;
            FinishGameUseCase::new(context.clone())
                .execute(&lobby_key, connection_id)
                .await?;
        }
        ClientEvent::GameEnded(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload).await?;
            AdvanceQuestionUseCase::new(context.clone())
                .end_game(&lobby_key, connection_id)
                .await?;
        }
        ClientEvent::SetReady(payload) => {
            let lobby_key = resolve_lobby(context, connection_id, &payload.lobby).await?;
            SetReadyUseCase::new(context.clone())
                .execute(&lobby_key, connection_id, payload.ready)
                .await?;
        }
    }
    Ok(())
}

/// Build the join request, falling back to the connect-time identity
fn join_request(payload: JoinLobbyPayload, query: &ConnectQuery) -> Result<JoinRequest, UseCaseError> {
    let lobby_code = payload
        .lobby_code
        .filter(|code| !code.trim().is_empty())
        .map(|code| LobbyCode::new(code.trim().to_string()))
        .transpose()?;
    let player_id = match payload.player_id.or_else(|| query.user_id.clone()) {
        Some(id) => PlayerId::new(id)?,
        None => PlayerIdFactory::guest()?,
    };
    let display_name = payload
        .player_name
        .or_else(|| query.username.clone())
        .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());

    Ok(JoinRequest {
        game_id: GameId::new(payload.game_id)?,
        lobby_code,
        player_id,
        display_name: DisplayName::new(display_name)?,
    })
}

/// Resolve the target lobby: `lobbyKey`, then `gameId` + `lobbyCode`, then the joined lobby
async fn resolve_lobby(
    context: &SessionContext,
    connection_id: &ConnectionId,
    lobby: &LobbyRefPayload,
) -> Result<LobbyKey, UseCaseError> {
    if let Some(serialized) = &lobby.lobby_key {
        return Ok(LobbyKey::parse(serialized)?);
    }
    if let (Some(game_id), Some(lobby_code)) = (&lobby.game_id, &lobby.lobby_code) {
        return Ok(LobbyKey::new(
            GameId::new(game_id.clone())?,
            LobbyCode::new(lobby_code.clone())?,
        ));
    }
    context
        .connections
        .binding(connection_id)
        .await
        .map(|binding| binding.lobby_key)
        .ok_or_else(|| UseCaseError::NotFound("This connection has not joined a lobby".to_string()))
}

/// Send the error event matching the failed action
async fn reply_error(
    context: &SessionContext,
    connection_id: &ConnectionId,
    action: &str,
    error: &UseCaseError,
) {
    let message = error.to_string();
    let event = match action {
        "join-lobby" | "join-game-session" => ServerEvent::JoinError(ErrorPayload { message }),
        "start-game" => ServerEvent::StartError(ErrorPayload { message }),
        _ => ServerEvent::ActionError(ActionErrorPayload {
            action: action.to_string(),
            code: error.code().to_string(),
            message,
        }),
    };
    context.connections.send_to(connection_id, &event).await;
}

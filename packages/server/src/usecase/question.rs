//! 問題の配信とカウントダウン

use crate::{
    domain::{Lobby, LobbyState, Player},
    infrastructure::dto::websocket::{GameSettingsDto, NextQuestionPayload, QuestionDto, ServerEvent},
};

use super::{close_question::CloseQuestionUseCase, context::SessionContext};

/// Build `next-question`; the host's copy carries the correct answer
fn next_question_event(lobby: &Lobby, time_limit: Option<u32>, for_host: bool) -> Option<ServerEvent> {
    let question = lobby.current_question()?;
    Some(ServerEvent::NextQuestion(NextQuestionPayload {
        question_index: lobby.current_question_index(),
        total_questions: lobby.total_questions(),
        game_settings: GameSettingsDto::from(lobby.settings()),
        time_limit,
        question: QuestionDto::from(question),
        correct_answer_index: for_host.then_some(question.correct_choice_index),
    }))
}

/// 開いたばかりの問題を配信し、制限時間があればカウントダウンを開始する
///
/// 回答者には正解を含まない `next-question` を、ホストには
/// `correctAnswerIndex` 付きのものを送ります。
pub(crate) async fn open_question(context: &SessionContext, lobby: &Lobby) {
    let lobby_key = lobby.key().clone();
    let question_index = lobby.current_question_index();
    let limit = lobby.question_time_limit();
    let limit_secs = limit.map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX));

    let Some(for_players) = next_question_event(lobby, limit_secs, false) else {
        tracing::warn!("Lobby '{}' has no question {}", lobby_key, question_index);
        return;
    };
    context
        .connections
        .broadcast_to_competitors(lobby, &for_players)
        .await;
    if let (Some(host), Some(for_host)) = (lobby.host(), next_question_event(lobby, limit_secs, true)) {
        context.connections.send_to(&host.connection_id, &for_host).await;
    }
    tracing::info!(
        "Lobby '{}' opened question {}/{}",
        lobby_key,
        question_index + 1,
        lobby.total_questions()
    );

    let Some(limit) = limit else {
        return;
    };
    let expiry_context = context.clone();
    let expiry_key = lobby_key.clone();
    context
        .timers
        .schedule(lobby_key, question_index, limit, async move {
            if let Err(e) = CloseQuestionUseCase::new(expiry_context)
                .on_timer_expired(&expiry_key, question_index)
                .await
            {
                tracing::debug!(
                    "Countdown for question {} of lobby '{}' found nothing to close: {}",
                    question_index,
                    expiry_key,
                    e
                );
            }
        })
        .await;
}

/// 途中参加・再接続したプレイヤーに現在の問題を送る
///
/// 回答済みの回答者には送りません。制限時間は残り時間です。
pub(crate) async fn send_current_question(context: &SessionContext, lobby: &Lobby, player: &Player) {
    if lobby.state() != LobbyState::Playing {
        return;
    }
    if !player.is_host && lobby.answers().iter().any(|a| a.player_id == player.id) {
        return;
    }
    let time_limit = lobby.time_remaining_secs(context.clock.now());
    if let Some(event) = next_question_event(lobby, time_limit, player.is_host) {
        context.connections.send_to(&player.connection_id, &event).await;
    }
}

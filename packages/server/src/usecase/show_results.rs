//! UseCase: 回答統計とランキングの表示（ホスト専用）

use crate::{
    domain::{ConnectionId, LeaderboardReveal, Lobby, LobbyError, LobbyKey, PlayerId, QuestionSummary},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    close_question::{LeaderboardView, answer_stats_event, leaderboard_event},
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
};

/// 結果表示のユースケース
pub struct ShowResultsUseCase {
    context: SessionContext,
}

impl ShowResultsUseCase {
    /// 新しい ShowResultsUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 回答統計を表示する（`show-answer-stats`）
    ///
    /// 回答受付中なら問題を締め切って SHOWING_STATS に移り、すでに統計の表示中
    /// なら同じ統計を再送します。
    pub async fn show_answer_stats(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        question_index: Option<usize>,
    ) -> Result<QuestionSummary, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = host_requester(&lobby, connection_id, question_index)?;

        let index = lobby.current_question_index();
        let summary = lobby.reveal_stats(&requester, context.clock.now())?;
        context.timers.cancel(lobby_key, index).await;
        tracing::info!("Lobby '{}' shows stats of question {}", lobby_key, index);

        context
            .connections
            .broadcast_to_lobby(&lobby, &answer_stats_event(&summary))
            .await;
        Ok(summary)
    }

    /// ランキングを表示する（`show-leaderboard-command` / `show-classification-command`）
    pub async fn show_leaderboard(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        question_index: Option<usize>,
        view: LeaderboardView,
    ) -> Result<LeaderboardReveal, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = host_requester(&lobby, connection_id, question_index)?;

        let index = lobby.current_question_index();
        let reveal = lobby.reveal_leaderboard(&requester, context.clock.now())?;
        if let LeaderboardReveal::ClosedQuestion(_) = &reveal {
            context.timers.cancel(lobby_key, index).await;
        }
        tracing::info!("Lobby '{}' shows the leaderboard after question {}", lobby_key, index);

        let event: ServerEvent = leaderboard_event(&lobby, view);
        context.connections.broadcast_to_lobby(&lobby, &event).await;
        Ok(reveal)
    }
}

/// ホストであることと、指定された問題番号が現在の問題であることを確認する
fn host_requester(
    lobby: &Lobby,
    connection_id: &ConnectionId,
    question_index: Option<usize>,
) -> Result<PlayerId, UseCaseError> {
    let requester = requester(lobby, connection_id)?;
    if !lobby.is_host(&requester) {
        return Err(LobbyError::NotHost(requester.to_string()).into());
    }
    if let Some(requested) = question_index
        && requested != lobby.current_question_index()
    {
        return Err(LobbyError::QuestionMismatch {
            requested,
            current: lobby.current_question_index(),
        }
        .into());
    }
    Ok(requester)
}

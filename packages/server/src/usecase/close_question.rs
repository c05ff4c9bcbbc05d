//! UseCase: 問題の締め切りと結果の表示
//!
//! ### どのような状況を想定しているか
//! - 正常系：カウントダウン満了、ホストの time-up、全員回答
//! - エッジケース：古い問題のカウントダウン（何もしない）、二重の time-up

use crate::{
    domain::{CloseTarget, ConnectionId, Lobby, LobbyError, LobbyKey, LobbyState, QuestionSummary},
    infrastructure::dto::websocket::{AnswerStatDto, AnswerStatsPayload, LeaderboardPayload, ServerEvent},
};

use super::{
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
};

/// ランキング表示に使うイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardView {
    /// `show-leaderboard`
    Leaderboard,
    /// `show-classification`
    Classification,
}

/// 問題締め切りのユースケース
pub struct CloseQuestionUseCase {
    context: SessionContext,
}

impl CloseQuestionUseCase {
    /// 新しい CloseQuestionUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// ホストの `time-up` による締め切り
    ///
    /// `question_index` が回答受付中の問題でなければ何もしません（`Ok(None)`）。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        question_index: Option<usize>,
    ) -> Result<Option<QuestionSummary>, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;
        if !lobby.is_host(&requester) {
            return Err(LobbyError::NotHost(requester.to_string()).into());
        }

        let index = question_index.unwrap_or(lobby.current_question_index());
        if !is_open(&lobby, index) {
            tracing::debug!(
                "Ignoring time-up for question {} of lobby '{}' ({})",
                index,
                lobby_key,
                lobby.state()
            );
            return Ok(None);
        }

        let summary = close_locked(
            context,
            &mut lobby,
            index,
            CloseTarget::FromSettings,
            LeaderboardView::Leaderboard,
        )
        .await?;
        Ok(Some(summary))
    }

    /// カウントダウン満了による締め切り
    ///
    /// 問題がすでに締め切られていれば `Ok(false)` を返します。
    pub async fn on_timer_expired(
        &self,
        lobby_key: &LobbyKey,
        question_index: usize,
    ) -> Result<bool, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        if !is_open(&lobby, question_index) {
            tracing::debug!(
                "Stale countdown for question {} of lobby '{}'",
                question_index,
                lobby_key
            );
            return Ok(false);
        }

        tracing::info!("Time is up for question {} of lobby '{}'", question_index, lobby_key);
        close_locked(
            context,
            &mut lobby,
            question_index,
            CloseTarget::FromSettings,
            LeaderboardView::Leaderboard,
        )
        .await?;
        Ok(true)
    }
}

fn is_open(lobby: &Lobby, question_index: usize) -> bool {
    lobby.state() == LobbyState::Playing && lobby.current_question_index() == question_index
}

/// ロック済みのロビーで問題を締め切り、結果を配信する
pub(crate) async fn close_locked(
    context: &SessionContext,
    lobby: &mut Lobby,
    question_index: usize,
    target: CloseTarget,
    view: LeaderboardView,
) -> Result<QuestionSummary, LobbyError> {
    let summary = lobby.close_question(question_index, target, context.clock.now())?;
    context.timers.cancel(lobby.key(), question_index).await;
    tracing::info!(
        "Closed question {} of lobby '{}' with {} answer(s)",
        question_index,
        lobby.key(),
        lobby.answers().len()
    );
    announce(context, lobby, &summary, view).await;
    Ok(summary)
}

/// 全回答者が回答済みなら問題を締め切る
pub(crate) async fn close_if_all_answered(context: &SessionContext, lobby: &mut Lobby) {
    if !lobby.all_answered() {
        return;
    }
    let index = lobby.current_question_index();
    tracing::debug!("All players answered question {} of lobby '{}'", index, lobby.key());
    if let Err(e) = close_locked(
        context,
        lobby,
        index,
        CloseTarget::FromSettings,
        LeaderboardView::Leaderboard,
    )
    .await
    {
        tracing::warn!("Could not close question {} of lobby '{}': {}", index, lobby.key(), e);
    }
}

/// 締め切り後の状態に応じた結果イベントを配信する
pub(crate) async fn announce(
    context: &SessionContext,
    lobby: &Lobby,
    summary: &QuestionSummary,
    view: LeaderboardView,
) {
    let event = match lobby.state() {
        LobbyState::ShowingStats => answer_stats_event(summary),
        LobbyState::ShowingLeaderboard => leaderboard_event(lobby, view),
        _ => return,
    };
    context.connections.broadcast_to_lobby(lobby, &event).await;
}

pub(crate) fn answer_stats_event(summary: &QuestionSummary) -> ServerEvent {
    ServerEvent::AnswerStatsReady(AnswerStatsPayload {
        answer_stats: summary.answer_stats.iter().map(AnswerStatDto::from).collect(),
        correct_answer_index: summary.correct_choice_index,
        question_index: summary.question_index,
    })
}

pub(crate) fn leaderboard_event(lobby: &Lobby, view: LeaderboardView) -> ServerEvent {
    let payload = LeaderboardPayload::from_lobby(lobby, Some(lobby.current_question_index()));
    match view {
        LeaderboardView::Leaderboard => ServerEvent::ShowLeaderboard(payload),
        LeaderboardView::Classification => ServerEvent::ShowClassification(payload),
    }
}

//! UseCase: 回答の送信
//!
//! ### どのような状況を想定しているか
//! - 正常系：正解・不正解の記録と得点の加算
//! - 異常系：二重回答、ホストの回答、古い問題への回答、範囲外の選択肢、
//!   接続と異なる playerId
//! - エッジケース：最後の回答で問題が締め切られる

use crate::{
    domain::{AnswerRecord, ConnectionId, LobbyKey, PlayerId},
    infrastructure::dto::websocket::{PlayerAnsweredPayload, ServerEvent},
};

use super::{
    close_question::close_if_all_answered,
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
};

/// 送信された回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    /// ペイロードに含まれていた playerId（接続のプレイヤーと一致する必要がある）
    pub player_id: Option<PlayerId>,
    pub question_index: usize,
    pub choice_index: usize,
    /// クライアントが申告した残り秒数（制限時間なしの問題でのみ使う）
    pub time_left: Option<u32>,
}

/// 回答送信のユースケース
pub struct SubmitAnswerUseCase {
    context: SessionContext,
}

impl SubmitAnswerUseCase {
    /// 新しい SubmitAnswerUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 回答を記録する
    ///
    /// 正誤と得点はサーバー側で判定します。記録後、全員に `players-updated`、
    /// 回答者以外に `player-answered` を送信し、全員が回答していれば問題を
    /// 締め切ります。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        submission: AnswerSubmission,
    ) -> Result<AnswerRecord, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let player_id = requester(&lobby, connection_id)?;
        if let Some(claimed) = &submission.player_id
            && claimed != &player_id
        {
            return Err(UseCaseError::Validation(format!(
                "Player '{claimed}' does not match this connection"
            )));
        }

        let record = lobby.submit_answer(
            &player_id,
            submission.question_index,
            submission.choice_index,
            submission.time_left,
            context.rules.points_per_correct_answer,
            context.clock.now(),
        )?;
        tracing::info!(
            "Player '{}' answered question {} of lobby '{}' ({})",
            player_id,
            submission.question_index,
            lobby_key,
            if record.is_correct { "correct" } else { "wrong" }
        );

        let player_name = lobby
            .find_player(&player_id)
            .map(|p| p.display_name.to_string())
            .unwrap_or_default();
        context
            .connections
            .broadcast_to_lobby(&lobby, &ServerEvent::players_updated(&lobby))
            .await;
        context
            .connections
            .broadcast_to_lobby_except(
                &lobby,
                connection_id,
                &ServerEvent::PlayerAnswered(PlayerAnsweredPayload {
                    player_id: player_id.to_string(),
                    player_name,
                    question_index: submission.question_index,
                    time_left: record.time_remaining_secs,
                    is_correct: lobby
                        .settings()
                        .show_correct_answers
                        .then_some(record.is_correct),
                }),
            )
            .await;

        close_if_all_answered(context, &mut lobby).await;
        Ok(record)
    }
}

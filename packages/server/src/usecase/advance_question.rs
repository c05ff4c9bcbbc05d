//! UseCase: 次の問題へ進む（ホスト専用）

use tokio::sync::OwnedMutexGuard;

use crate::{
    domain::{Advance, ConnectionId, Lobby, LobbyError, LobbyKey, PlayerId},
    infrastructure::dto::websocket::{LeaderboardPayload, ServerEvent},
};

use super::{
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
    finish_game::{save_results, take_results},
    question::open_question,
};

/// 問題送りのユースケース
pub struct AdvanceQuestionUseCase {
    context: SessionContext,
}

impl AdvanceQuestionUseCase {
    /// 新しい AdvanceQuestionUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// ランキング表示から次の問題へ進む
    ///
    /// `expected_index` はクライアントが次だと考えている問題番号で、現在の
    /// 番号 + 1 と異なる場合は古いコマンドとして拒否します。最後の問題の
    /// 後では `game-ended` を配信し、結果を保存します。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        expected_index: Option<usize>,
    ) -> Result<Advance, UseCaseError> {
        let (_handle, lobby) = lock_lobby(&self.context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;
        self.advance(lobby, &requester, expected_index).await
    }

    /// 最後の問題のランキング表示からゲームを終える（`game-ended`）
    ///
    /// 問題が残っている場合は Validation エラーで、ロビーは変わりません。
    pub async fn end_game(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
    ) -> Result<Advance, UseCaseError> {
        let (_handle, lobby) = lock_lobby(&self.context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;
        if !lobby.is_host(&requester) {
            return Err(LobbyError::NotHost(requester.to_string()).into());
        }
        let next = lobby.current_question_index() + 1;
        if next < lobby.total_questions() {
            return Err(UseCaseError::Validation(format!(
                "Lobby '{}' still has {} question(s) to play",
                lobby_key,
                lobby.total_questions() - next
            )));
        }
        self.advance(lobby, &requester, Some(next)).await
    }

    async fn advance(
        &self,
        mut lobby: OwnedMutexGuard<Lobby>,
        requester: &PlayerId,
        expected_index: Option<usize>,
    ) -> Result<Advance, UseCaseError> {
        let context = &self.context;
        let advance = lobby.advance(requester, expected_index, context.clock.now())?;
        let results = match advance {
            Advance::NextQuestion(_) => {
                open_question(context, &lobby).await;
                None
            }
            Advance::Finished => {
                tracing::info!("Game in lobby '{}' ended", lobby.key());
                context
                    .connections
                    .broadcast_to_lobby(
                        &lobby,
                        &ServerEvent::GameEnded(LeaderboardPayload::from_lobby(&lobby, None)),
                    )
                    .await;
                take_results(context, &mut lobby)
            }
        };

        // 外部サービスへの保存はロックを手放してから
        drop(lobby);
        if let Some(results) = results {
            save_results(context, results).await;
        }
        Ok(advance)
    }
}

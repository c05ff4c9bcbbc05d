//! UseCase: ロビーからの離脱
//!
//! ### どのような状況を想定しているか
//! - 正常系：プレイヤーの離脱、ホスト離脱時の昇格
//! - エッジケース：最後の 1 人の離脱（ロビー削除）、再接続済みの古い接続での離脱（何もしない）、
//!   未回答の最後のプレイヤーの離脱（問題の締め切り）

use crate::{
    domain::{ConnectionId, LeaveOutcome, LobbyKey},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    close_question::close_if_all_answered,
    context::{SessionContext, close_lobby, lock_lobby},
    error::UseCaseError,
};

/// ロビー離脱のユースケース
pub struct LeaveLobbyUseCase {
    context: SessionContext,
}

impl LeaveLobbyUseCase {
    /// 新しい LeaveLobbyUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 接続に紐づくプレイヤーをロビーから外す
    ///
    /// # Returns
    ///
    /// * `Ok(Some(_))` - 離脱したプレイヤーと、昇格した新ホスト
    /// * `Ok(None)` - その接続のプレイヤーはいない（再接続済みなど）
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
    ) -> Result<Option<LeaveOutcome>, UseCaseError> {
        let context = &self.context;
        let (handle, mut lobby) = lock_lobby(context, lobby_key).await?;

        let Some(outcome) = lobby.leave(connection_id, context.clock.now()) else {
            tracing::debug!(
                "Connection '{}' has no player in lobby '{}'",
                connection_id,
                lobby_key
            );
            return Ok(None);
        };
        context.connections.unbind(connection_id, lobby_key).await;
        tracing::info!("Player '{}' left lobby '{}'", outcome.removed.id, lobby_key);

        if lobby.is_empty() {
            close_lobby(context, &handle, &mut lobby).await;
            return Ok(Some(outcome));
        }

        if let Some(new_host) = &outcome.promoted_host {
            tracing::info!("Player '{}' is now host of lobby '{}'", new_host, lobby_key);
        }
        context
            .connections
            .broadcast_to_lobby(&lobby, &ServerEvent::lobby_updated(&lobby))
            .await;
        close_if_all_answered(context, &mut lobby).await;

        Ok(Some(outcome))
    }
}

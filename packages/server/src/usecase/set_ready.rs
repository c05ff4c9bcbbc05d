//! UseCase: 準備状態の切り替え

use crate::{
    domain::{ConnectionId, LobbyKey},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    context::{SessionContext, lock_lobby},
    error::UseCaseError,
};

/// 準備状態切り替えのユースケース
pub struct SetReadyUseCase {
    context: SessionContext,
}

impl SetReadyUseCase {
    /// 新しい SetReadyUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 要求元プレイヤーの準備状態を更新し、名簿を配信する
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        ready: bool,
    ) -> Result<(), UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let player = lobby.set_ready(connection_id, ready, context.clock.now())?;
        tracing::debug!(
            "Player '{}' in lobby '{}' is {}",
            player.id,
            lobby_key,
            if ready { "ready" } else { "not ready" }
        );

        context
            .connections
            .broadcast_to_lobby(&lobby, &ServerEvent::lobby_updated(&lobby))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{conn, harness, key};

    #[tokio::test]
    async fn test_set_ready_broadcasts_roster() {
        // テスト項目: 準備状態の変更が名簿に反映されて配信される
        // given (前提条件):
        let h = harness();
        let (mut host, alice, _bob) = h.lobby_of_three("g1").await;
        host.drain();

        // when (操作):
        SetReadyUseCase::new(h.context.clone())
            .execute(&key("g1"), &alice.connection_id, false)
            .await
            .unwrap();

        // then (期待する結果):
        let update = host.last("lobby-updated").unwrap();
        assert_eq!(update["data"]["players"][1]["ready"], false);
        assert_eq!(update["data"]["players"][0]["ready"], true);
    }

    #[tokio::test]
    async fn test_set_ready_from_non_member() {
        // テスト項目: ロビーに参加していない接続からの変更は NotFound
        // given (前提条件):
        let h = harness();
        h.lobby_of_three("g1").await;

        // when (操作):
        let result = SetReadyUseCase::new(h.context.clone())
            .execute(&key("g1"), &conn("stranger"), true)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::NotFound(_))));
    }
}

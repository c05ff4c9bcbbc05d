//! UseCase: 名簿の再送

use crate::{
    domain::{ConnectionId, LobbyKey},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    context::{SessionContext, lock_lobby},
    error::UseCaseError,
};

/// 名簿要求のユースケース
pub struct PlayersListUseCase {
    context: SessionContext,
}

impl PlayersListUseCase {
    /// 新しい PlayersListUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 要求元にだけ `players-updated` を送る
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
    ) -> Result<(), UseCaseError> {
        let (_handle, lobby) = lock_lobby(&self.context, lobby_key).await?;
        self.context
            .connections
            .send_to(connection_id, &ServerEvent::players_updated(&lobby))
            .await;
        Ok(())
    }
}

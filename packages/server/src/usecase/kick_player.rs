//! UseCase: プレイヤーのキック（ホスト専用）

use crate::{
    domain::{ConnectionId, LobbyKey, Player, PlayerId},
    infrastructure::dto::websocket::{PlayerKickedPayload, ServerEvent},
};

use super::{
    close_question::close_if_all_answered,
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
};

const KICKED_MESSAGE: &str = "You have been removed from the lobby by the host";
const KICKED_REASON: &str = "Kicked by host";

/// キックのユースケース
pub struct KickPlayerUseCase {
    context: SessionContext,
}

impl KickPlayerUseCase {
    /// 新しい KickPlayerUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// キックを実行
    ///
    /// 対象に `player-kicked` を送ってから接続を切り離し、残りのプレイヤーに
    /// 名簿を配信します。ホスト以外からの要求と、ホスト自身を対象にした要求は
    /// Authorization エラー（応答なし）です。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        target: &PlayerId,
    ) -> Result<Player, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;

        let kicked = lobby.kick(&requester, target, context.clock.now())?;
        tracing::info!(
            "Host '{}' kicked player '{}' from lobby '{}'",
            requester,
            kicked.id,
            lobby_key
        );

        context
            .connections
            .send_to(
                &kicked.connection_id,
                &ServerEvent::PlayerKicked(PlayerKickedPayload {
                    message: KICKED_MESSAGE.to_string(),
                    reason: KICKED_REASON.to_string(),
                }),
            )
            .await;
        context
            .connections
            .unbind(&kicked.connection_id, lobby_key)
            .await;
        context
            .connections
            .broadcast_to_lobby(&lobby, &ServerEvent::lobby_updated(&lobby))
            .await;
        close_if_all_answered(context, &mut lobby).await;

        Ok(kicked)
    }
}

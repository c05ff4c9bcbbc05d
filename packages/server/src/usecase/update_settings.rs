//! UseCase: ゲーム設定の変更（ホスト専用）

use crate::{
    domain::{ConnectionId, GameSettings, LobbyKey, SettingsPatch},
    infrastructure::dto::websocket::{GameSettingsDto, ServerEvent, SettingsUpdatedPayload},
};

use super::{
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
};

/// 設定変更のユースケース
pub struct UpdateSettingsUseCase {
    context: SessionContext,
}

impl UpdateSettingsUseCase {
    /// 新しい UpdateSettingsUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 設定変更を実行
    ///
    /// `patch` に含まれる項目だけを現在の設定に上書きし、ロビー全体に
    /// `settings-updated` を送信します。回答時間の変更は次の問題から有効です。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        patch: SettingsPatch,
    ) -> Result<GameSettings, UseCaseError> {
        let context = &self.context;
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;

        let settings = lobby.settings().merged(&patch);
        lobby.update_settings(&requester, settings, context.clock.now())?;
        tracing::info!("Lobby '{}' settings updated: {:?}", lobby_key, settings);

        context
            .connections
            .broadcast_to_lobby(
                &lobby,
                &ServerEvent::SettingsUpdated(SettingsUpdatedPayload {
                    settings: GameSettingsDto::from(&settings),
                }),
            )
            .await;

        Ok(settings)
    }
}

//! UseCase: 接続の切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectPlayerUseCase::execute() メソッド
//! - 切断後、再接続の猶予が過ぎてからロビーを離脱する処理
//!
//! ### なぜこのテストが必要か
//! - 一時的な切断（リロードなど）でスコアやホスト権限を失わないことを保証
//! - 猶予内に再接続した場合、古い接続の離脱が何もしないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：猶予経過後の離脱
//! - エッジケース：猶予内の再接続、ロビー未参加の接続の切断

use tokio::task::JoinHandle;

use crate::domain::ConnectionId;

use super::{context::SessionContext, leave_lobby::LeaveLobbyUseCase};

/// 接続切断のユースケース
pub struct DisconnectPlayerUseCase {
    context: SessionContext,
}

impl DisconnectPlayerUseCase {
    /// 新しい DisconnectPlayerUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 切断を実行
    ///
    /// 接続を登録から外し、ロビーに参加していた場合は猶予時間後に離脱させます。
    /// 返り値は離脱までを担うバックグラウンドタスクです。
    pub fn execute(&self, connection_id: ConnectionId) -> JoinHandle<()> {
        let context = self.context.clone();
        tokio::spawn(async move {
            let Some(binding) = context.connections.unregister(&connection_id).await else {
                tracing::debug!("Connection '{}' closed outside any lobby", connection_id);
                return;
            };

            let grace = context.rules.reconnect_grace;
            tracing::info!(
                "Player '{}' disconnected from lobby '{}', waiting {:?} for a reconnect",
                binding.player_id,
                binding.lobby_key,
                grace
            );
            tokio::time::sleep(grace).await;

            match LeaveLobbyUseCase::new(context)
                .execute(&binding.lobby_key, &connection_id)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => tracing::debug!(
                    "Player '{}' reconnected before the grace period ended",
                    binding.player_id
                ),
                Err(e) => tracing::debug!(
                    "Lobby '{}' gone before player '{}' left: {}",
                    binding.lobby_key,
                    binding.player_id,
                    e
                ),
            }
        })
    }
}

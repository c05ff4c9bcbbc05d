//! Repository trait (インターフェース)
//!
//! ドメイン層が必要とするロビーの保存先を抽象化します。
//! 実装はインフラ層（`infrastructure::repository`）が提供します。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    entity::{GameSettings, Lobby},
    error::RepositoryError,
    value_object::{LobbyKey, Timestamp},
};

/// 1 つのロビーへの共有ハンドル
///
/// ロビーを操作する処理はこのロックを処理の最後まで保持します。
pub type LobbyHandle = Arc<Mutex<Lobby>>;

/// Lobby Repository trait
#[async_trait]
pub trait LobbyRepository: Send + Sync {
    /// ロビーを取得する。存在しなければ `settings` で作成する
    async fn get_or_create(
        &self,
        key: &LobbyKey,
        settings: GameSettings,
        now: Timestamp,
    ) -> LobbyHandle;

    /// ロビーを取得する
    async fn find(&self, key: &LobbyKey) -> Result<LobbyHandle, RepositoryError>;

    /// `handle` がまだ `key` に登録されている場合だけ削除する
    ///
    /// 削除できたかどうかを返します。
    async fn remove(&self, key: &LobbyKey, handle: &LobbyHandle) -> bool;

    /// 全ロビーのハンドル一覧
    async fn list(&self) -> Vec<LobbyHandle>;

    /// ロビー数
    async fn count(&self) -> usize;
}

//! InMemory Lobby Repository 実装
//!
//! ドメイン層が定義する LobbyRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! マップ自体のロックはエントリの取得・追加・削除の間だけ保持し、
//! ロビーの中身はロビーごとのロック（`LobbyHandle`）で保護します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    GameSettings, Lobby, LobbyHandle, LobbyKey, LobbyRepository, RepositoryError, Timestamp,
};

/// インメモリ Lobby Repository 実装
#[derive(Default)]
pub struct InMemoryLobbyRepository {
    lobbies: Mutex<HashMap<LobbyKey, LobbyHandle>>,
}

impl InMemoryLobbyRepository {
    /// 新しい InMemoryLobbyRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LobbyRepository for InMemoryLobbyRepository {
    async fn get_or_create(
        &self,
        key: &LobbyKey,
        settings: GameSettings,
        now: Timestamp,
    ) -> LobbyHandle {
        let mut lobbies = self.lobbies.lock().await;
        lobbies
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::info!("Created lobby '{}'", key);
                Arc::new(Mutex::new(Lobby::new(key.clone(), settings, now)))
            })
            .clone()
    }

    async fn find(&self, key: &LobbyKey) -> Result<LobbyHandle, RepositoryError> {
        let lobbies = self.lobbies.lock().await;
        lobbies
            .get(key)
            .cloned()
            .ok_or_else(|| RepositoryError::LobbyNotFound(key.to_string()))
    }

    async fn remove(&self, key: &LobbyKey, handle: &LobbyHandle) -> bool {
        let mut lobbies = self.lobbies.lock().await;
        match lobbies.get(key) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                lobbies.remove(key);
                tracing::info!("Removed lobby '{}'", key);
                true
            }
            _ => false,
        }
    }

    async fn list(&self) -> Vec<LobbyHandle> {
        let lobbies = self.lobbies.lock().await;
        lobbies.values().cloned().collect()
    }

    async fn count(&self) -> usize {
        self.lobbies.lock().await.len()
    }
}

//! UseCase: 放置されたロビーの削除
//!
//! 待機中・終了済みのまま一定時間操作のないロビーを定期的に削除します。
//! ゲーム中のロビーは対象外です。

use crate::infrastructure::dto::websocket::{LobbyClosedPayload, ServerEvent};

use super::context::{SessionContext, close_lobby};

const IDLE_REASON: &str = "Lobby closed after a period of inactivity";

/// 放置ロビー削除のユースケース
pub struct ReapIdleLobbiesUseCase {
    context: SessionContext,
}

impl ReapIdleLobbiesUseCase {
    /// 新しい ReapIdleLobbiesUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// 削除したロビーの数を返す
    pub async fn execute(&self) -> usize {
        let context = &self.context;
        let ttl = context.rules.idle_lobby_ttl;
        let mut reaped = 0;

        for handle in context.repository.list().await {
            let mut lobby = handle.clone().lock_owned().await;
            if lobby.is_closed() || !lobby.is_idle(context.clock.now(), ttl) {
                continue;
            }
            context
                .connections
                .broadcast_to_lobby(
                    &lobby,
                    &ServerEvent::LobbyClosed(LobbyClosedPayload {
                        reason: IDLE_REASON.to_string(),
                    }),
                )
                .await;
            tracing::info!(
                "Reaping idle lobby '{}' ({}, {} player(s))",
                lobby.key(),
                lobby.state(),
                lobby.players().len()
            );
            close_lobby(context, &handle, &mut lobby).await;
            reaped += 1;
        }

        if reaped > 0 {
            tracing::info!(
                "Reaped {} idle lobby(ies), {} remaining",
                reaped,
                context.repository.count().await
            );
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockClock, Timestamp},
        infrastructure::{ConnectionRegistry, InMemoryLobbyRepository, StaticGameGateway},
        usecase::{
            GameRules, StartGameUseCase,
            test_support::{harness, key},
        },
    };
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn test_idle_waiting_lobby_is_reaped() {
        // テスト項目: TTL を過ぎた待機中のロビーが削除され、lobby-closed が届く
        // given (前提条件):
        let h = harness();
        let mut host = h.join("g1", "h1", "Admin").await;
        host.drain();
        h.clock.advance(31 * 60 * 1000);

        // when (操作):
        let reaped = ReapIdleLobbiesUseCase::new(h.context.clone()).execute().await;

        // then (期待する結果):
        assert_eq!(reaped, 1);
        assert_eq!(h.context.repository.count().await, 0);
        let closed = host.last("lobby-closed").unwrap();
        assert_eq!(closed["data"]["reason"], IDLE_REASON);
        assert!(h.context.connections.binding(&host.connection_id).await.is_none());
    }

    #[tokio::test]
    async fn test_active_and_playing_lobbies_are_kept() {
        // テスト項目: 最近操作のあったロビーとゲーム中のロビーは削除されない
        // given (前提条件):
        let h = harness();
        let (host, _alice, _bob) = h.lobby_of_three("g1").await;
        StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();
        h.clock.advance(60 * 60 * 1000);
        h.join("g2", "h2", "Other").await;

        // when (操作):
        let reaped = ReapIdleLobbiesUseCase::new(h.context.clone()).execute().await;

        // then (期待する結果):
        assert_eq!(reaped, 0);
        assert_eq!(h.context.repository.count().await, 2);
    }

    #[tokio::test]
    async fn test_reap_with_empty_store() {
        // テスト項目: ロビーがなければ時計を読まずに終わる
        // given (前提条件):
        let mut clock = MockClock::new();
        clock.expect_now().times(0).returning(|| Timestamp::new(0));
        let context = SessionContext::new(
            Arc::new(InMemoryLobbyRepository::new()),
            ConnectionRegistry::new(),
            Arc::new(StaticGameGateway::default()),
            Arc::new(clock),
            GameRules {
                idle_lobby_ttl: Duration::from_secs(1),
                ..GameRules::default()
            },
        );

        // when (操作):
        let reaped = ReapIdleLobbiesUseCase::new(context).execute().await;

        // then (期待する結果):
        assert_eq!(reaped, 0);
    }
}

//! UseCase: ゲームの終了とロビーの解散（ホスト専用）

use crate::{
    domain::{ConnectionId, GameResults, Lobby, LobbyKey},
    infrastructure::dto::websocket::{EmptyPayload, ServerEvent},
};

use super::{
    context::{SessionContext, close_lobby, lock_lobby, requester},
    error::UseCaseError,
};

/// ゲーム終了のユースケース
pub struct FinishGameUseCase {
    context: SessionContext,
}

impl FinishGameUseCase {
    /// 新しい FinishGameUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// ゲームを終了し、ロビーを解散する
    ///
    /// 全員に `game-finished` を送信し、ロビーを削除して全接続の紐づけを
    /// 外します。ゲームが行われていれば、ロックを手放した後で結果を保存します。
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
    ) -> Result<(), UseCaseError> {
        let context = &self.context;
        let (handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;

        let played = lobby.finish(&requester, context.clock.now())?;
        context.timers.cancel_all(lobby_key).await;
        context
            .connections
            .broadcast_to_lobby(&lobby, &ServerEvent::GameFinished(EmptyPayload {}))
            .await;
        let results = if played {
            take_results(context, &mut lobby)
        } else {
            None
        };

        close_lobby(context, &handle, &mut lobby).await;
        drop(lobby);
        tracing::info!("Lobby '{}' finished and closed by host '{}'", lobby_key, requester);

        if let Some(results) = results {
            save_results(context, results).await;
        }
        Ok(())
    }
}

/// 保存する最終結果を確定する（ロビーごとに 1 回だけ）
///
/// ロックを保持したまま呼び、返った結果はロックを手放してから
/// [`save_results`] に渡します。
pub(crate) fn take_results(context: &SessionContext, lobby: &mut Lobby) -> Option<GameResults> {
    if !lobby.mark_results_recorded() {
        return None;
    }
    let lobby_key = lobby.key();
    Some(GameResults {
        game_id: lobby_key.game_id().clone(),
        lobby_code: lobby_key.lobby_code().clone(),
        finished_at: context.clock.now(),
        total_questions: lobby.total_questions(),
        standings: lobby.leaderboard(),
    })
}

/// 最終結果を外部サービスに保存する
///
/// 保存の失敗はログに残すだけで、ゲームの進行には影響しません。
pub(crate) async fn save_results(context: &SessionContext, results: GameResults) {
    let lobby_key = LobbyKey::new(results.game_id.clone(), results.lobby_code.clone());
    match context.gateway.save_results(&results).await {
        Ok(()) => tracing::info!(
            "Saved results of lobby '{}' ({} player(s))",
            lobby_key,
            results.standings.len()
        ),
        Err(e) => tracing::warn!("Failed to save results of lobby '{}': {}", lobby_key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{GameDefinition, GameId, GatewayError, MockGameGateway, Question},
        usecase::{
            StartGameUseCase,
            test_support::{harness, harness_with_gateway, key},
        },
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finish_closes_lobby_and_saves_results() {
        // テスト項目: ゲーム中の終了で game-finished が届き、結果が保存され、ロビーが削除される
        // given (前提条件):
        let h = harness();
        let (host, mut alice, _bob) = h.lobby_of_three("g1").await;
        StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();
        alice.drain();

        // when (操作):
        FinishGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(alice.last("game-finished").is_some());
        assert_eq!(h.context.repository.count().await, 0);
        assert!(h.context.connections.binding(&alice.connection_id).await.is_none());
        assert!(!h.context.timers.is_scheduled(&key("g1"), 0).await);
        let saved = h.gateway.saved_results().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].standings.len(), 2);
    }

    #[tokio::test]
    async fn test_finish_before_start_saves_nothing() {
        // テスト項目: 開始前の終了では結果を保存しない
        // given (前提条件):
        let h = harness();
        let (host, _alice, _bob) = h.lobby_of_three("g1").await;

        // when (操作):
        FinishGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(h.gateway.saved_results().await.is_empty());
        assert_eq!(h.context.repository.count().await, 0);
    }

    #[tokio::test]
    async fn test_save_failure_is_not_fatal() {
        // テスト項目: 結果の保存に失敗してもロビーは解散される
        // given (前提条件):
        let mut gateway = MockGameGateway::new();
        gateway.expect_fetch_game().returning(|game_id: &GameId| {
            Ok(GameDefinition {
                game_id: game_id.clone(),
                title: None,
                questions: vec![
                    Question::new(
                        "1 + 1 = ?".to_string(),
                        vec!["1".to_string(), "2".to_string()],
                        None,
                        1,
                    )
                    .unwrap(),
                ],
            })
        });
        gateway
            .expect_save_results()
            .times(1)
            .returning(|_| Err(GatewayError::Unavailable("timeout".to_string())));
        let h = harness_with_gateway(Arc::new(gateway));
        let (host, _alice, _bob) = h.lobby_of_three("g1").await;
        StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();

        // when (操作):
        let result = FinishGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(h.context.repository.count().await, 0);
    }

    #[tokio::test]
    async fn test_finish_by_non_host_is_silent() {
        // テスト項目: ホスト以外の終了要求は無視される
        // given (前提条件):
        let h = harness();
        let (_host, alice, _bob) = h.lobby_of_three("g1").await;

        // when (操作):
        let result = FinishGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &alice.connection_id)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Authorization(_))));
        assert_eq!(h.context.repository.count().await, 1);
    }
}

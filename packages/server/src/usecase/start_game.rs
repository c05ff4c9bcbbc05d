//! UseCase: ゲームの開始（ホスト専用）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StartGameUseCase::execute() メソッド
//! - 問題セットの取得から最初の問題の配信まで
//!
//! ### なぜこのテストが必要か
//! - 外部サービスの障害でロビーが壊れないことを保証
//! - 開始できない状態では外部サービスに問い合わせないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始と最初の問題の配信、設定の上書き
//! - 異常系：人数不足、ホスト以外の開始、外部サービスの障害、空の問題セット

use crate::{
    domain::{ConnectionId, LobbyKey, SettingsPatch},
    infrastructure::dto::websocket::{GameSettingsDto, GameStartedPayload, PlayerDto, ServerEvent},
};

use super::{
    context::{SessionContext, lock_lobby, requester},
    error::UseCaseError,
    question::open_question,
};

/// ゲーム開始のユースケース
pub struct StartGameUseCase {
    context: SessionContext,
}

impl StartGameUseCase {
    /// 新しい StartGameUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// ゲーム開始を実行
    ///
    /// 問題セットの取得はロビーのロックを外して行い、取得後に開始条件を
    /// 再確認します。成功すると `game-started` を配信して最初の問題を開きます。
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 問題数
    pub async fn execute(
        &self,
        lobby_key: &LobbyKey,
        connection_id: &ConnectionId,
        overrides: Option<SettingsPatch>,
    ) -> Result<usize, UseCaseError> {
        let context = &self.context;

        // 1. 開始条件の確認（外部サービスに問い合わせる前）
        let settings = {
            let (_handle, lobby) = lock_lobby(context, lobby_key).await?;
            let requester = requester(&lobby, connection_id)?;
            let settings = overrides.map(|patch| lobby.settings().merged(&patch));
            lobby.ensure_can_start(&requester, settings.as_ref())?;
            settings
        };

        // 2. 問題セットの取得
        let game = context
            .gateway
            .fetch_game(lobby_key.game_id())
            .await
            .inspect_err(|e| {
                tracing::warn!("Could not load questions for lobby '{}': {}", lobby_key, e)
            })?;

        // 3. 再確認して開始
        let (_handle, mut lobby) = lock_lobby(context, lobby_key).await?;
        let requester = requester(&lobby, connection_id)?;
        lobby.start(&requester, settings, game.questions, context.clock.now())?;
        let total_questions = lobby.total_questions();
        tracing::info!(
            "Lobby '{}' started {} with {} player(s) and {} question(s)",
            lobby_key,
            game.title.as_deref().unwrap_or("game"),
            lobby.players().len(),
            total_questions
        );

        // 4. 通知と最初の問題
        context
            .connections
            .broadcast_to_lobby(
                &lobby,
                &ServerEvent::GameStarted(GameStartedPayload {
                    game_id: lobby_key.game_id().to_string(),
                    lobby_code: lobby_key.lobby_code().to_string(),
                    players: PlayerDto::roster(&lobby),
                    game_settings: GameSettingsDto::from(lobby.settings()),
                    total_questions,
                }),
            )
            .await;
        open_question(context, &lobby).await;

        Ok(total_questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{GameDefinition, GameId, GatewayError, LobbyState, MockGameGateway},
        usecase::test_support::{harness, harness_with_gateway, key},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_start_sends_first_question() {
        // テスト項目: 開始すると game-started と最初の問題が配信され、正解はホストにだけ送られる
        // given (前提条件):
        let h = harness();
        let (mut host, mut alice, _bob) = h.lobby_of_three("g1").await;
        host.drain();
        alice.drain();

        // when (操作):
        let total = StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(total, 1);
        let events = alice.drain();
        assert_eq!(events[0]["event"], "game-started");
        assert_eq!(events[0]["data"]["totalQuestions"], 1);
        assert_eq!(events[1]["event"], "next-question");
        assert_eq!(events[1]["data"]["question"]["text"], "2 + 2 = ?");
        assert_eq!(events[1]["data"]["timeLimit"], 30);
        assert!(events[1]["data"].get("correctAnswerIndex").is_none());
        let for_host = host.last("next-question").unwrap();
        assert_eq!(for_host["data"]["correctAnswerIndex"], 1);
        assert!(h.context.timers.is_scheduled(&key("g1"), 0).await);
    }

    #[tokio::test]
    async fn test_start_with_settings_override() {
        // テスト項目: 開始時の設定上書きが適用される（0 秒は制限時間なし）
        // given (前提条件):
        let h = harness();
        let (host, mut alice, _bob) = h.lobby_of_three("g1").await;
        alice.drain();

        // when (操作):
        StartGameUseCase::new(h.context.clone())
            .execute(
                &key("g1"),
                &host.connection_id,
                Some(SettingsPatch {
                    time_per_question_secs: Some(0),
                    ..SettingsPatch::default()
                }),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let question = alice.last("next-question").unwrap();
        assert!(question["data"].get("timeLimit").is_none());
        assert!(!h.context.timers.is_scheduled(&key("g1"), 0).await);
    }

    #[tokio::test]
    async fn test_start_alone_is_rejected() {
        // テスト項目: ホスト 1 人では開始できない
        // given (前提条件):
        let h = harness();
        let host = h.join("g1", "h1", "Admin").await;

        // when (操作):
        let result = StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Capacity(_))));
    }

    #[tokio::test]
    async fn test_start_by_non_host_never_reaches_gateway() {
        // テスト項目: ホスト以外の開始要求は外部サービスに問い合わせずに無視される
        // given (前提条件):
        let mut gateway = MockGameGateway::new();
        gateway.expect_fetch_game().times(0);
        let h = harness_with_gateway(Arc::new(gateway));
        let (_host, alice, _bob) = h.lobby_of_three("g1").await;

        // when (操作):
        let result = StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &alice.connection_id, None)
            .await;

        // then (期待する結果):
        assert!(matches!(&result, Err(e) if e.is_silent()));
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_lobby_waiting() {
        // テスト項目: 外部サービスの障害では開始せず、ロビーは WAITING のまま
        // given (前提条件):
        let mut gateway = MockGameGateway::new();
        gateway
            .expect_fetch_game()
            .times(1)
            .returning(|_| Err(GatewayError::Unavailable("connection refused".to_string())));
        let h = harness_with_gateway(Arc::new(gateway));
        let (host, mut alice, _bob) = h.lobby_of_three("g1").await;
        alice.drain();

        // when (操作):
        let result = StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Gateway(_))));
        let handle = h.context.repository.find(&key("g1")).await.unwrap();
        assert_eq!(handle.lock().await.state(), LobbyState::Waiting);
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn test_empty_question_set_is_rejected() {
        // テスト項目: 問題のないゲームは開始できない
        // given (前提条件):
        let mut gateway = MockGameGateway::new();
        gateway.expect_fetch_game().returning(|game_id: &GameId| {
            Ok(GameDefinition {
                game_id: game_id.clone(),
                title: None,
                questions: Vec::new(),
            })
        });
        let h = harness_with_gateway(Arc::new(gateway));
        let (host, _alice, _bob) = h.lobby_of_three("g1").await;

        // when (操作):
        let result = StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Validation(_))));
        let handle = h.context.repository.find(&key("g1")).await.unwrap();
        assert_eq!(handle.lock().await.state(), LobbyState::Waiting);
    }
}

//! UseCase: ロビーへの参加（再接続を含む）
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加、最初の参加者がホストになる、同じ playerId での再接続
//! - 異常系：定員超過、終了済みロビーへの新規参加
//! - エッジケース：別ロビーへの移動、削除と同時に発生した参加、ゲーム画面からの再接続

use crate::{
    domain::{
        ConnectionId, DisplayName, GameId, JoinOutcome, Lobby, LobbyCode, LobbyCodeFactory,
        LobbyKey, LobbyState, Player, PlayerId,
    },
    infrastructure::dto::websocket::{JoinSuccessPayload, ServerEvent},
};

use super::{
    context::{SessionContext, close_lobby, lock_lobby},
    error::UseCaseError,
    leave_lobby::LeaveLobbyUseCase,
    question::send_current_question,
};

/// 参加リクエスト
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub game_id: GameId,
    /// 省略時はサーバーがコードを発行する
    pub lobby_code: Option<LobbyCode>,
    pub player_id: PlayerId,
    pub display_name: DisplayName,
}

/// 参加結果
#[derive(Debug, Clone)]
pub struct JoinedLobby {
    pub lobby_key: LobbyKey,
    pub player: Player,
    pub reconnected: bool,
}

/// ロビー参加のユースケース
pub struct JoinLobbyUseCase {
    context: SessionContext,
}

impl JoinLobbyUseCase {
    /// 新しい JoinLobbyUseCase を作成
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    /// ロビー参加を実行
    ///
    /// 成功すると要求元に `join-success` を返し、ロビー全体に `lobby-updated`
    /// を送信します。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        request: JoinRequest,
    ) -> Result<JoinedLobby, UseCaseError> {
        let context = &self.context;
        let lobby_code = match request.lobby_code {
            Some(code) => code,
            None => LobbyCodeFactory::generate()?,
        };
        let lobby_key = LobbyKey::new(request.game_id, lobby_code);

        // 1. 別のロビー（または別のプレイヤーとして）参加中なら先に抜ける
        leave_previous(context, connection_id, &lobby_key, &request.player_id).await;

        // 2. ロビーを取得（なければ作成）してロック
        let (handle, mut lobby) = loop {
            let handle = context
                .repository
                .get_or_create(
                    &lobby_key,
                    context.rules.default_settings,
                    context.clock.now(),
                )
                .await;
            let lobby = handle.clone().lock_owned().await;
            if !lobby.is_closed() {
                break (handle, lobby);
            }
            // removed while we waited for the lock; the store holds a fresh one now
        };

        // 3. 参加（既存の playerId なら再接続）
        let outcome = match lobby.join(
            request.player_id,
            request.display_name,
            connection_id.clone(),
            context.clock.now(),
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                if lobby.is_empty() {
                    close_lobby(context, &handle, &mut lobby).await;
                }
                return Err(e.into());
            }
        };

        Ok(admit(context, connection_id, &lobby, outcome).await)
    }

    /// ゲーム画面の新しい接続を、既存のプレイヤーに紐づけ直す
    ///
    /// `join-game-session` 用。再接続だけを受け付け、ロビーの作成や新規参加は
    /// 行いません。
    pub async fn rejoin(
        &self,
        connection_id: &ConnectionId,
        request: JoinRequest,
    ) -> Result<JoinedLobby, UseCaseError> {
        let context = &self.context;
        let lobby_code = request.lobby_code.ok_or_else(|| {
            UseCaseError::Validation("lobbyCode is required to rejoin a game session".to_string())
        })?;
        let lobby_key = LobbyKey::new(request.game_id, lobby_code);

        leave_previous(context, connection_id, &lobby_key, &request.player_id).await;
        let (_handle, mut lobby) = lock_lobby(context, &lobby_key).await?;
        if lobby.find_player(&request.player_id).is_none() {
            return Err(UseCaseError::NotFound(format!(
                "Player '{}' is not part of lobby '{}'",
                request.player_id, lobby_key
            )));
        }

        let outcome = lobby.join(
            request.player_id,
            request.display_name,
            connection_id.clone(),
            context.clock.now(),
        )?;
        Ok(admit(context, connection_id, &lobby, outcome).await)
    }
}

/// 別のロビー（または別のプレイヤーとして）参加中の接続を先に離脱させる
async fn leave_previous(
    context: &SessionContext,
    connection_id: &ConnectionId,
    lobby_key: &LobbyKey,
    player_id: &PlayerId,
) {
    if let Some(previous) = context.connections.binding(connection_id).await
        && (&previous.lobby_key != lobby_key || &previous.player_id != player_id)
    {
        if let Err(e) = LeaveLobbyUseCase::new(context.clone())
            .execute(&previous.lobby_key, connection_id)
            .await
        {
            tracing::debug!(
                "Previous lobby '{}' of connection '{}' already gone: {}",
                previous.lobby_key,
                connection_id,
                e
            );
        }
    }
}

/// 接続を紐づけ、参加を通知する（ロックは呼び出し元が保持）
async fn admit(
    context: &SessionContext,
    connection_id: &ConnectionId,
    lobby: &Lobby,
    outcome: JoinOutcome,
) -> JoinedLobby {
    let lobby_key = lobby.key().clone();

    // 再接続なら古い接続を切り離す
    if let Some(previous_connection) = &outcome.previous_connection {
        context
            .connections
            .unbind(previous_connection, &lobby_key)
            .await;
    }
    context
        .connections
        .bind(connection_id, lobby_key.clone(), outcome.player.id.clone())
        .await;

    if outcome.reconnected {
        tracing::info!(
            "Player '{}' reconnected to lobby '{}' on connection '{}'",
            outcome.player.id,
            lobby_key,
            connection_id
        );
    } else {
        tracing::info!(
            "Player '{}' ({}) joined lobby '{}' as {}",
            outcome.player.id,
            outcome.player.display_name,
            lobby_key,
            if outcome.player.is_host { "host" } else { "player" }
        );
    }

    let success = ServerEvent::JoinSuccess(JoinSuccessPayload {
        lobby_key: lobby_key.to_string(),
        game_id: lobby_key.game_id().to_string(),
        lobby_code: lobby_key.lobby_code().to_string(),
        player_id: outcome.player.id.to_string(),
        is_host: outcome.player.is_host,
        reconnected: outcome.reconnected,
    });
    context.connections.send_to(connection_id, &success).await;
    context
        .connections
        .broadcast_to_lobby(lobby, &ServerEvent::lobby_updated(lobby))
        .await;

    // 回答受付中なら、まだ回答していないプレイヤーに現在の問題を送る
    if lobby.state() == LobbyState::Playing {
        send_current_question(context, lobby, &outcome.player).await;
    }

    JoinedLobby {
        lobby_key,
        player: outcome.player,
        reconnected: outcome.reconnected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::GameSettings,
        usecase::test_support::{conn, harness, harness_with_settings, key, pid},
    };

    fn request(game_id: &str, code: Option<&str>, id: &str, name: &str) -> JoinRequest {
        JoinRequest {
            game_id: GameId::new(game_id.to_string()).unwrap(),
            lobby_code: code.map(|c| LobbyCode::new(c.to_string()).unwrap()),
            player_id: pid(id),
            display_name: DisplayName::new(name.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_join_creates_lobby_and_first_player_is_host() {
        // テスト項目: 未知のロビーへの参加でロビーが作成され、最初の参加者がホストになる
        // given (前提条件):
        let h = harness();
        let mut host = h.connect("h1").await;
        let usecase = JoinLobbyUseCase::new(h.context.clone());

        // when (操作):
        let joined = usecase
            .execute(
                &host.connection_id,
                request("g1", Some("ABC123"), "h1", "Admin"),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(joined.player.is_host);
        assert_eq!(joined.lobby_key.to_string(), "g1-ABC123");
        assert_eq!(h.context.repository.count().await, 1);
        let events = host.drain();
        assert_eq!(events[0]["event"], "join-success");
        assert_eq!(events[0]["data"]["isHost"], true);
        assert_eq!(events[0]["data"]["playerId"], "h1");
        assert_eq!(events[1]["event"], "lobby-updated");
        assert_eq!(events[1]["data"]["gameStarted"], false);
    }

    #[tokio::test]
    async fn test_join_without_code_mints_one() {
        // テスト項目: lobbyCode を省略するとサーバーが 6 文字のコードを発行する
        // given (前提条件):
        let h = harness();
        let host = h.connect("h1").await;

        // when (操作):
        let joined = JoinLobbyUseCase::new(h.context.clone())
            .execute(&host.connection_id, request("g1", None, "h1", "Admin"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(joined.lobby_key.lobby_code().as_str().len(), 6);
    }

    #[tokio::test]
    async fn test_join_broadcasts_roster_to_everyone() {
        // テスト項目: 参加するとロビー全員に最新の名簿が送られる
        // given (前提条件):
        let h = harness();
        let mut host = h.join("g1", "h1", "Admin").await;
        host.drain();

        // when (操作):
        let _alice = h.join("g1", "p1", "Alice").await;

        // then (期待する結果):
        let update = host.last("lobby-updated").unwrap();
        let players = update["data"]["players"].as_array().unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[1]["name"], "Alice");
        assert_eq!(players[1]["isHost"], false);
    }

    #[tokio::test]
    async fn test_join_full_lobby_fails() {
        // テスト項目: 定員に達したロビーへの参加は Capacity エラーになり、名簿は変わらない
        // given (前提条件):
        let h = harness_with_settings(GameSettings {
            max_players: 2,
            ..GameSettings::default()
        });
        h.join("g1", "h1", "Admin").await;
        h.join("g1", "p1", "Alice").await;
        let bob = h.connect("p2").await;

        // when (操作):
        let result = JoinLobbyUseCase::new(h.context.clone())
            .execute(&bob.connection_id, request("g1", Some("ABC123"), "p2", "Bob"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::Capacity(_))));
        let handle = h.context.repository.find(&key("g1")).await.unwrap();
        assert_eq!(handle.lock().await.players().len(), 2);
        assert!(h.context.connections.binding(&conn("p2")).await.is_none());
    }

    #[tokio::test]
    async fn test_reconnect_keeps_host_and_unbinds_old_connection() {
        // テスト項目: 新しい接続での再参加は再接続扱いになり、古い接続のバインドは外れる
        // given (前提条件):
        let h = harness();
        let old = h.join("g1", "h1", "Admin").await;
        h.join("g1", "p1", "Alice").await;
        let mut new = h
            .connect_as(ConnectionId::new("conn-h1-new".to_string()).unwrap())
            .await;

        // when (操作):
        let joined = JoinLobbyUseCase::new(h.context.clone())
            .execute(&new.connection_id, request("g1", Some("ABC123"), "h1", "Admin"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(joined.reconnected);
        assert!(joined.player.is_host);
        let handle = h.context.repository.find(&key("g1")).await.unwrap();
        assert_eq!(handle.lock().await.players().len(), 2);
        assert!(h.context.connections.binding(&old.connection_id).await.is_none());
        assert!(new.last("join-success").is_some());
        assert!(
            h.context
                .connections
                .binding(&new.connection_id)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_join_success_reports_reconnect() {
        // テスト項目: 再接続時の join-success には reconnected=true と現在のホスト状態が入る
        // given (前提条件):
        let h = harness();
        h.join("g1", "h1", "Admin").await;
        let mut again = h
            .connect_as(ConnectionId::new("conn-h1-b".to_string()).unwrap())
            .await;

        // when (操作):
        JoinLobbyUseCase::new(h.context.clone())
            .execute(&again.connection_id, request("g1", Some("ABC123"), "h1", "Admin"))
            .await
            .unwrap();

        // then (期待する結果):
        let events = again.drain();
        assert_eq!(events[0]["event"], "join-success");
        assert_eq!(events[0]["data"]["reconnected"], true);
        assert_eq!(events[0]["data"]["isHost"], true);
    }

    #[tokio::test]
    async fn test_join_other_lobby_leaves_previous() {
        // テスト項目: 別のロビーに参加すると前のロビーから抜ける
        // given (前提条件):
        let h = harness();
        let host = h.join("g1", "h1", "Admin").await;

        // when (操作):
        JoinLobbyUseCase::new(h.context.clone())
            .execute(&host.connection_id, request("g2", Some("ABC123"), "h1", "Admin"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(h.context.repository.find(&key("g1")).await.is_err());
        assert!(h.context.repository.find(&key("g2")).await.is_ok());
        let binding = h.context.connections.binding(&host.connection_id).await.unwrap();
        assert_eq!(binding.lobby_key, key("g2"));
    }

    #[tokio::test]
    async fn test_join_during_game_receives_current_question() {
        // テスト項目: 回答受付中に再接続したプレイヤーには現在の問題が送られる
        // given (前提条件):
        let h = harness();
        let (host, _alice, _bob) = h.lobby_of_three("g1").await;
        crate::usecase::StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();
        let mut alice_again = h
            .connect_as(ConnectionId::new("conn-p1-b".to_string()).unwrap())
            .await;

        // when (操作):
        JoinLobbyUseCase::new(h.context.clone())
            .execute(
                &alice_again.connection_id,
                request("g1", Some("ABC123"), "p1", "Alice"),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let question = alice_again.last("next-question").unwrap();
        assert_eq!(question["data"]["questionIndex"], 0);
        assert!(question["data"].get("correctAnswerIndex").is_none());
    }

    #[tokio::test]
    async fn test_rejoin_rebinds_game_screen_connection() {
        // テスト項目: ゲーム画面の新しい接続で再参加すると既存のプレイヤーに紐づけ直される
        // given (前提条件):
        let h = harness();
        let (host, alice, _bob) = h.lobby_of_three("g1").await;
        crate::usecase::StartGameUseCase::new(h.context.clone())
            .execute(&key("g1"), &host.connection_id, None)
            .await
            .unwrap();
        let mut game_screen = h
            .connect_as(ConnectionId::new("conn-p1-game".to_string()).unwrap())
            .await;

        // when (操作):
        let joined = JoinLobbyUseCase::new(h.context.clone())
            .rejoin(
                &game_screen.connection_id,
                request("g1", Some("ABC123"), "p1", "Alice"),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(joined.reconnected);
        assert!(h.context.connections.binding(&alice.connection_id).await.is_none());
        let binding = h
            .context
            .connections
            .binding(&game_screen.connection_id)
            .await
            .unwrap();
        assert_eq!(binding.player_id, pid("p1"));
        assert!(game_screen.last("next-question").is_some());
    }

    #[tokio::test]
    async fn test_rejoin_unknown_player_is_not_found() {
        // テスト項目: ロビーにいないプレイヤーの再参加は NotFound で、名簿は変わらない
        // given (前提条件):
        let h = harness();
        h.lobby_of_three("g1").await;
        let stranger = h.connect("p9").await;

        // when (操作):
        let result = JoinLobbyUseCase::new(h.context.clone())
            .rejoin(
                &stranger.connection_id,
                request("g1", Some("ABC123"), "p9", "Mallory"),
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::NotFound(_))));
        let handle = h.context.repository.find(&key("g1")).await.unwrap();
        assert_eq!(handle.lock().await.players().len(), 3);
        assert!(h.context.connections.binding(&stranger.connection_id).await.is_none());
    }

    #[tokio::test]
    async fn test_rejoin_never_creates_lobby() {
        // テスト項目: 存在しないロビーへの再参加は NotFound で、ロビーは作成されない
        // given (前提条件):
        let h = harness();
        let client = h.connect("h1").await;

        // when (操作):
        let result = JoinLobbyUseCase::new(h.context.clone())
            .rejoin(&client.connection_id, request("g1", Some("ABC123"), "h1", "Admin"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(UseCaseError::NotFound(_))));
        assert_eq!(h.context.repository.count().await, 0);
    }
}

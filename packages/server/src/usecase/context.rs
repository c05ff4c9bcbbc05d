//! ユースケース共通の依存関係とヘルパー

use std::{sync::Arc, time::Duration};

use tokio::sync::OwnedMutexGuard;

use crate::{
    domain::{
        Clock, ConnectionId, GameGateway, GameSettings, Lobby, LobbyHandle, LobbyKey,
        LobbyRepository, PlayerId,
    },
    infrastructure::{ConnectionRegistry, QuestionTimers},
};

use super::error::UseCaseError;

/// Default points awarded for a correct answer
pub const DEFAULT_POINTS_PER_CORRECT_ANSWER: u32 = 10;

/// Default time a disconnected player keeps their seat
pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_secs(5);

/// Default lifetime of an idle WAITING/FINISHED lobby
pub const DEFAULT_IDLE_LOBBY_TTL: Duration = Duration::from_secs(30 * 60);

/// ゲームのルール（設定値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// 新しいロビーの初期設定
    pub default_settings: GameSettings,
    /// 正解 1 問あたりの得点
    pub points_per_correct_answer: u32,
    /// 切断から離脱扱いになるまでの猶予
    pub reconnect_grace: Duration,
    /// 放置されたロビーを削除するまでの時間
    pub idle_lobby_ttl: Duration,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            default_settings: GameSettings::default(),
            points_per_correct_answer: DEFAULT_POINTS_PER_CORRECT_ANSWER,
            reconnect_grace: DEFAULT_RECONNECT_GRACE,
            idle_lobby_ttl: DEFAULT_IDLE_LOBBY_TTL,
        }
    }
}

/// 全ユースケースが共有する依存関係
#[derive(Clone)]
pub struct SessionContext {
    /// Repository（データアクセス層の抽象化）
    pub repository: Arc<dyn LobbyRepository>,
    /// 接続中のクライアントとブロードキャスト
    pub connections: ConnectionRegistry,
    /// 外部のゲームデータサービス
    pub gateway: Arc<dyn GameGateway>,
    pub clock: Arc<dyn Clock>,
    pub timers: QuestionTimers,
    pub rules: GameRules,
}

impl SessionContext {
    pub fn new(
        repository: Arc<dyn LobbyRepository>,
        connections: ConnectionRegistry,
        gateway: Arc<dyn GameGateway>,
        clock: Arc<dyn Clock>,
        rules: GameRules,
    ) -> Self {
        Self {
            repository,
            connections,
            gateway,
            clock,
            timers: QuestionTimers::new(),
            rules,
        }
    }
}

/// ロビーを取得してロックする
///
/// 削除済み（closed）のロビーは NotFound として扱います。
pub(crate) async fn lock_lobby(
    context: &SessionContext,
    lobby_key: &LobbyKey,
) -> Result<(LobbyHandle, OwnedMutexGuard<Lobby>), UseCaseError> {
    let handle = context.repository.find(lobby_key).await?;
    let lobby = handle.clone().lock_owned().await;
    if lobby.is_closed() {
        return Err(UseCaseError::NotFound(format!(
            "Lobby '{lobby_key}' not found"
        )));
    }
    Ok((handle, lobby))
}

/// 接続に紐づくプレイヤー（操作の要求元）を特定する
///
/// ペイロードの playerId ではなく、接続 ID から判定します。ロビーに
/// プレイヤーがいない接続は NotFound です。
pub(crate) fn requester(
    lobby: &Lobby,
    connection_id: &ConnectionId,
) -> Result<PlayerId, UseCaseError> {
    lobby
        .find_by_connection(connection_id)
        .map(|p| p.id.clone())
        .ok_or_else(|| {
            UseCaseError::NotFound(format!(
                "Connection '{connection_id}' is not a player of lobby '{}'",
                lobby.key()
            ))
        })
}

/// ロビーを閉じてストアから削除する
///
/// カウントダウンを止め、全接続のバインドを外します。
pub(crate) async fn close_lobby(context: &SessionContext, handle: &LobbyHandle, lobby: &mut Lobby) {
    let lobby_key = lobby.key().clone();
    context.timers.cancel_all(&lobby_key).await;
    context.connections.unbind_lobby(&lobby_key).await;
    lobby.mark_closed();
    context.repository.remove(&lobby_key, handle).await;
}

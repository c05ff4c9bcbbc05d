//! ユースケースのテスト用ヘルパー

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    domain::{
        Clock, ConnectionId, DisplayName, GameGateway, GameId, GameSettings, LobbyCode, LobbyKey,
        PlayerId, Timestamp,
    },
    infrastructure::{ConnectionRegistry, InMemoryLobbyRepository, StaticGameGateway},
};

use super::{
    context::{GameRules, SessionContext},
    join_lobby::{JoinLobbyUseCase, JoinRequest},
};

/// 1 問・正解 1 のゲーム "g1" と、2 問のゲーム "g2"
pub const GAMES: &str = r#"{
    "g1": {"title": "Math", "questions": [
        {"question_text": "2 + 2 = ?", "answers": [
            {"answer_text": "3", "is_correct": 0},
            {"answer_text": "4", "is_correct": 1},
            {"answer_text": "5", "is_correct": 0}
        ]}
    ]},
    "g2": {"title": "Two", "questions": [
        {"question_text": "first", "answers": [
            {"answer_text": "a", "is_correct": 1},
            {"answer_text": "b", "is_correct": 0}
        ]},
        {"question_text": "second", "answers": [
            {"answer_text": "a", "is_correct": 0},
            {"answer_text": "b", "is_correct": 1}
        ]}
    ]}
}"#;

/// 手動で進める時計
#[derive(Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.0.load(Ordering::SeqCst))
    }
}

pub struct Harness {
    pub context: SessionContext,
    pub clock: Arc<ManualClock>,
    pub gateway: StaticGameGateway,
}

pub fn harness() -> Harness {
    harness_with_settings(GameSettings {
        max_players: 4,
        time_per_question_secs: 30,
        show_correct_answers: false,
    })
}

pub fn harness_with_settings(settings: GameSettings) -> Harness {
    let gateway = StaticGameGateway::from_json(GAMES).unwrap();
    let mut harness = harness_with_gateway(Arc::new(gateway.clone()));
    harness.context.rules.default_settings = settings;
    harness.gateway = gateway;
    harness
}

pub fn harness_with_gateway(gateway: Arc<dyn GameGateway>) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let context = SessionContext::new(
        Arc::new(InMemoryLobbyRepository::new()),
        ConnectionRegistry::new(),
        gateway,
        clock.clone(),
        GameRules {
            default_settings: GameSettings {
                max_players: 4,
                time_per_question_secs: 30,
                show_correct_answers: false,
            },
            ..GameRules::default()
        },
    );
    Harness {
        context,
        clock,
        gateway: StaticGameGateway::default(),
    }
}

pub fn key(game_id: &str) -> LobbyKey {
    LobbyKey::new(
        GameId::new(game_id.to_string()).unwrap(),
        LobbyCode::new("ABC123".to_string()).unwrap(),
    )
}

pub fn pid(id: &str) -> PlayerId {
    PlayerId::new(id.to_string()).unwrap()
}

pub fn conn(id: &str) -> ConnectionId {
    ConnectionId::new(format!("conn-{id}")).unwrap()
}

/// 接続されたクライアント
pub struct Client {
    pub connection_id: ConnectionId,
    pub rx: UnboundedReceiver<String>,
}

impl Client {
    /// 受信済みのイベントをすべて取り出す
    pub fn drain(&mut self) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(json) = self.rx.try_recv() {
            events.push(serde_json::from_str(&json).unwrap());
        }
        events
    }

    /// 受信済みイベントの名前一覧
    pub fn event_names(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|e| e["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// 指定したイベントのうち最後に受信したもの
    pub fn last(&mut self, event: &str) -> Option<serde_json::Value> {
        self.drain().into_iter().rev().find(|e| e["event"] == event)
    }
}

impl Harness {
    pub async fn connect_as(&self, connection_id: ConnectionId) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        self.context
            .connections
            .register(connection_id.clone(), tx)
            .await;
        Client { connection_id, rx }
    }

    pub async fn connect(&self, id: &str) -> Client {
        self.connect_as(conn(id)).await
    }

    /// `id` として接続し、`game_id` の ABC123 ロビーに参加する
    pub async fn join(&self, game_id: &str, id: &str, name: &str) -> Client {
        let client = self.connect(id).await;
        JoinLobbyUseCase::new(self.context.clone())
            .execute(
                &client.connection_id,
                JoinRequest {
                    game_id: GameId::new(game_id.to_string()).unwrap(),
                    lobby_code: Some(LobbyCode::new("ABC123".to_string()).unwrap()),
                    player_id: pid(id),
                    display_name: DisplayName::new(name.to_string()).unwrap(),
                },
            )
            .await
            .unwrap();
        client
    }

    /// ホスト h1 (Admin)、p1 (Alice)、p2 (Bob) が参加済みのロビー
    pub async fn lobby_of_three(&self, game_id: &str) -> (Client, Client, Client) {
        let host = self.join(game_id, "h1", "Admin").await;
        let alice = self.join(game_id, "p1", "Alice").await;
        let bob = self.join(game_id, "p2", "Bob").await;
        (host, alice, bob)
    }
}

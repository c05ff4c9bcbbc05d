//! Shared fixtures for the integration tests: an in-process server and a
//! WebSocket client.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use quiz_lobby_server::{
    domain::GameSettings,
    infrastructure::{
        ConnectionRegistry, InMemoryLobbyRepository, StaticGameGateway, SystemClock,
    },
    serve,
    usecase::{GameRules, SessionContext},
};
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// "g1": one question, choice 1 correct. "g2": two questions.
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

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server running in this process on a random port
pub struct TestServer {
    addr: SocketAddr,
    pub gateway: StaticGameGateway,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start with lobby defaults maxPlayers=4, 30 s, showCorrectAnswers=false
    pub async fn start() -> Self {
        Self::start_with(GameRules {
            default_settings: GameSettings {
                max_players: 4,
                time_per_question_secs: 30,
                show_correct_answers: false,
            },
            reconnect_grace: Duration::from_millis(300),
            ..GameRules::default()
        })
        .await
    }

    pub async fn start_with(rules: GameRules) -> Self {
        let gateway = StaticGameGateway::from_json(GAMES).expect("Invalid game fixture");
        let context = SessionContext::new(
            Arc::new(InMemoryLobbyRepository::new()),
            ConnectionRegistry::new(),
            Arc::new(gateway.clone()),
            Arc::new(SystemClock),
            rules,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let addr = listener.local_addr().expect("Failed to read local address");

        let (shutdown, on_shutdown) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, context, Duration::from_secs(60), async move {
            let _ = on_shutdown.await;
        }));

        Self {
            addr,
            gateway,
            shutdown: Some(shutdown),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect and join `game_id`/ABC123 as `player_id`
    pub async fn join(&self, game_id: &str, player_id: &str, name: &str) -> WsClient {
        let mut client = WsClient::connect(&self.ws_url()).await;
        client
            .send(
                "join-lobby",
                json!({"gameId": game_id, "lobbyCode": "ABC123", "playerId": player_id, "playerName": name}),
            )
            .await;
        client.recv_event("join-success").await;
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// WebSocket test client speaking `{"event", "data"}` frames
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url).await.expect("Failed to connect");
        Self { stream }
    }

    pub async fn send(&mut self, event: &str, data: Value) {
        let frame = json!({"event": event, "data": data}).to_string();
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send frame");
    }

    /// Next event, failing after a timeout
    pub async fn recv(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for an event")
                .expect("Connection closed")
                .expect("WebSocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("Invalid JSON from server");
            }
        }
    }

    /// Skip events until `name` arrives
    pub async fn recv_event(&mut self, name: &str) -> Value {
        loop {
            let event = self.recv().await;
            if event["event"] == name {
                return event;
            }
        }
    }

    /// Assert that no event named `name` arrives within `window`
    pub async fn assert_no_event(&mut self, name: &str, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        while let Ok(Some(Ok(msg))) = tokio::time::timeout_at(deadline, self.stream.next()).await {
            if let Message::Text(text) = msg {
                let event: Value = serde_json::from_str(text.as_str()).expect("Invalid JSON");
                assert_ne!(event["event"], name, "unexpected event: {event}");
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

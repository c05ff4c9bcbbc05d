//! Connection registry and broadcast fan-out.
//!
//! Every open WebSocket is registered here with the channel that feeds its
//! send task. Once the connection joins a lobby it is bound to a
//! `(lobby, player)` pair; the lobby roster decides who receives a broadcast.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, mpsc::UnboundedSender};

use crate::{
    domain::{ConnectionId, Lobby, LobbyKey, PlayerId},
    infrastructure::dto::websocket::ServerEvent,
};

/// The lobby and player a connection acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub lobby_key: LobbyKey,
    pub player_id: PlayerId,
}

/// Client connection information
struct ClientInfo {
    /// Message sender channel
    sender: UnboundedSender<String>,
    binding: Option<Binding>,
}

/// Registry of live connections, cheap to clone
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    clients: Arc<Mutex<HashMap<ConnectionId, ClientInfo>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        connection_id: ConnectionId,
        sender: UnboundedSender<String>,
    ) {
        let mut clients = self.clients.lock().await;
        clients.insert(
            connection_id,
            ClientInfo {
                sender,
                binding: None,
            },
        );
    }

    /// Forget a connection, returning what it was bound to
    pub async fn unregister(&self, connection_id: &ConnectionId) -> Option<Binding> {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id).and_then(|info| info.binding)
    }

    /// Bind a connection to a player, returning the previous binding
    pub async fn bind(
        &self,
        connection_id: &ConnectionId,
        lobby_key: LobbyKey,
        player_id: PlayerId,
    ) -> Option<Binding> {
        let mut clients = self.clients.lock().await;
        let info = clients.get_mut(connection_id)?;
        info.binding.replace(Binding {
            lobby_key,
            player_id,
        })
    }

    /// Drop the binding of `connection_id` if it points at `lobby_key`
    pub async fn unbind(&self, connection_id: &ConnectionId, lobby_key: &LobbyKey) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.get_mut(connection_id) {
            Some(info) if info.binding.as_ref().is_some_and(|b| &b.lobby_key == lobby_key) => {
                info.binding = None;
                true
            }
            _ => false,
        }
    }

    /// Drop every binding to `lobby_key`
    pub async fn unbind_lobby(&self, lobby_key: &LobbyKey) {
        let mut clients = self.clients.lock().await;
        for info in clients.values_mut() {
            if info
                .binding
                .as_ref()
                .is_some_and(|b| &b.lobby_key == lobby_key)
            {
                info.binding = None;
            }
        }
    }

    pub async fn binding(&self, connection_id: &ConnectionId) -> Option<Binding> {
        let clients = self.clients.lock().await;
        clients.get(connection_id).and_then(|info| info.binding.clone())
    }

    pub async fn count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Send one event to one connection
    pub async fn send_to(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        let Some(json) = encode(event) else {
            return;
        };
        let clients = self.clients.lock().await;
        deliver(&clients, connection_id, event, json);
    }

    /// Send an event to every player of the lobby
    pub async fn broadcast_to_lobby(&self, lobby: &Lobby, event: &ServerEvent) {
        self.broadcast_where(lobby, event, |_| true).await;
    }

    /// Send an event to every player of the lobby except `excluded`
    pub async fn broadcast_to_lobby_except(
        &self,
        lobby: &Lobby,
        excluded: &ConnectionId,
        event: &ServerEvent,
    ) {
        self.broadcast_where(lobby, event, |conn| conn != excluded)
            .await;
    }

    /// Send an event to every player of the lobby but the host
    pub async fn broadcast_to_competitors(&self, lobby: &Lobby, event: &ServerEvent) {
        let host = lobby.host().map(|h| h.connection_id.clone());
        self.broadcast_where(lobby, event, |conn| Some(conn) != host.as_ref())
            .await;
    }

    async fn broadcast_where<F>(&self, lobby: &Lobby, event: &ServerEvent, include: F)
    where
        F: Fn(&ConnectionId) -> bool,
    {
        let Some(json) = encode(event) else {
            return;
        };
        let clients = self.clients.lock().await;
        let mut delivered = 0;
        for player in lobby.players() {
            if include(&player.connection_id)
                && deliver(&clients, &player.connection_id, event, json.clone())
            {
                delivered += 1;
            }
        }
        tracing::debug!(
            "Broadcasted '{}' to {} connection(s) in lobby '{}'",
            event.name(),
            delivered,
            lobby.key()
        );
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize '{}': {}", event.name(), e);
            None
        }
    }
}

fn deliver(
    clients: &HashMap<ConnectionId, ClientInfo>,
    connection_id: &ConnectionId,
    event: &ServerEvent,
    json: String,
) -> bool {
    match clients.get(connection_id) {
        Some(info) => {
            if info.sender.send(json).is_err() {
                tracing::warn!(
                    "Failed to send '{}' to connection '{}'",
                    event.name(),
                    connection_id
                );
                return false;
            }
            true
        }
        None => {
            // player is between a disconnect and its reconnect grace expiry
            tracing::debug!(
                "Connection '{}' is gone, dropping '{}'",
                connection_id,
                event.name()
            );
            false
        }
    }
}

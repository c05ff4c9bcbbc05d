//! Server state shared by the handlers.

use serde::Deserialize;

use crate::usecase::SessionContext;

/// Query parameters for WebSocket connection
///
/// Both are optional fallbacks for a `join-lobby` that omits `playerId` or
/// `playerName`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Shared application state
pub struct AppState {
    /// UseCase 層の依存関係（Repository、接続、ゲートウェイ、時計、タイマー）
    pub context: SessionContext,
}

impl AppState {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }
}

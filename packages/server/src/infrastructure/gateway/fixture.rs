//! Gateway serving question sets from a local JSON file.
//!
//! The file maps game ids to game documents in the quiz service's format:
//!
//! ```json
//! { "g1": { "title": "Math", "questions": [ { "question_text": "...", "answers": [...] } ] } }
//! ```
//!
//! Saved results are kept in memory.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::GameDocument;
use crate::domain::{GameDefinition, GameGateway, GameId, GameResults, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read game fixture '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse game fixture '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Offline gateway over a fixed set of games
#[derive(Clone, Default)]
pub struct StaticGameGateway {
    games: Arc<HashMap<String, GameDocument>>,
    saved: Arc<Mutex<Vec<GameResults>>>,
}

impl StaticGameGateway {
    pub fn new(games: HashMap<String, GameDocument>) -> Self {
        Self {
            games: Arc::new(games),
            saved: Arc::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| FixtureError::Parse {
            path: display,
            source,
        })
    }

    /// Results saved so far, oldest first
    pub async fn saved_results(&self) -> Vec<GameResults> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl GameGateway for StaticGameGateway {
    async fn fetch_game(&self, game_id: &GameId) -> Result<GameDefinition, GatewayError> {
        let document = self
            .games
            .get(game_id.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::GameNotFound(game_id.to_string()))?;
        document.into_definition(game_id)
    }

    async fn save_results(&self, results: &GameResults) -> Result<(), GatewayError> {
        self.saved.lock().await.push(results.clone());
        Ok(())
    }
}

//! HTTP client for the external quiz service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{GameDocument, ResultsDocument};
use crate::domain::{GameDefinition, GameGateway, GameId, GameResults, GatewayError};

/// Gateway talking to `GET {base}/games/{id}` and `POST {base}/games/{id}/results`
pub struct HttpGameGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGameGateway {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn game_url(&self, game_id: &GameId) -> String {
        format!("{}/games/{}", self.base_url, game_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl GameGateway for HttpGameGateway {
    async fn fetch_game(&self, game_id: &GameId) -> Result<GameDefinition, GatewayError> {
        let url = self.game_url(game_id);
        tracing::debug!("Fetching game '{}' from {}", game_id, url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(GatewayError::GameNotFound(game_id.to_string())),
            status => {
                return Err(GatewayError::Unavailable(format!(
                    "GET {url} answered {status}"
                )));
            }
        }

        let document: GameDocument = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidQuestionSet {
                game_id: game_id.to_string(),
                reason: e.to_string(),
            })?;
        document.into_definition(game_id)
    }

    async fn save_results(&self, results: &GameResults) -> Result<(), GatewayError> {
        let url = format!("{}/results", self.game_url(&results.game_id));
        let response = self
            .authorize(self.client.post(&url))
            .json(&ResultsDocument::from(results))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "POST {url} answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

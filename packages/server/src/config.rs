//! Server configuration from command-line flags and `QUIZ_LOBBY_*` environment variables.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{ArgAction, Parser};
use thiserror::Error;

use crate::{
    domain::{
        GameGateway, GameSettings, GatewayError, LobbyError,
        entity::{DEFAULT_MAX_PLAYERS, DEFAULT_TIME_PER_QUESTION_SECS},
    },
    infrastructure::{
        ConnectionRegistry, HttpGameGateway, InMemoryLobbyRepository, StaticGameGateway,
        SystemClock, gateway::fixture::FixtureError,
    },
    usecase::{
        GameRules, SessionContext,
        context::{DEFAULT_POINTS_PER_CORRECT_ANSWER, DEFAULT_RECONNECT_GRACE, DEFAULT_IDLE_LOBBY_TTL},
    },
};

/// Configuration errors, reported before the server binds
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Either --gateway-url or --games-file must be given")]
    MissingGateway,

    #[error("Invalid default game settings: {0}")]
    InvalidDefaults(#[from] LobbyError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Real-time quiz lobby and game-session coordinator
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, env = "QUIZ_LOBBY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "QUIZ_LOBBY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base URL of the game-data service
    #[arg(long, env = "QUIZ_LOBBY_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Bearer token for the game-data service
    #[arg(long, env = "QUIZ_LOBBY_GATEWAY_TOKEN", hide_env_values = true)]
    pub gateway_token: Option<String>,

    /// Request timeout for the game-data service, in seconds
    #[arg(long, env = "QUIZ_LOBBY_GATEWAY_TIMEOUT_SECS", default_value_t = 10)]
    pub gateway_timeout_secs: u64,

    /// Serve games from a local JSON file instead of the game-data service
    #[arg(long, env = "QUIZ_LOBBY_GAMES_FILE", conflicts_with = "gateway_url")]
    pub games_file: Option<PathBuf>,

    /// Default capacity of new lobbies, host included
    #[arg(long, env = "QUIZ_LOBBY_MAX_PLAYERS", default_value_t = DEFAULT_MAX_PLAYERS)]
    pub max_players: usize,

    /// Default answer window in seconds (0 = unlimited)
    #[arg(long, env = "QUIZ_LOBBY_TIME_PER_QUESTION", default_value_t = DEFAULT_TIME_PER_QUESTION_SECS)]
    pub time_per_question_secs: u32,

    /// Default for revealing correctness right after each answer
    #[arg(
        long,
        env = "QUIZ_LOBBY_SHOW_CORRECT_ANSWERS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub show_correct_answers: bool,

    /// Points awarded for a correct answer
    #[arg(long, env = "QUIZ_LOBBY_POINTS", default_value_t = DEFAULT_POINTS_PER_CORRECT_ANSWER)]
    pub points_per_correct_answer: u32,

    /// Seconds a disconnected player keeps their seat
    #[arg(long, env = "QUIZ_LOBBY_RECONNECT_GRACE_SECS", default_value_t = DEFAULT_RECONNECT_GRACE.as_secs())]
    pub reconnect_grace_secs: u64,

    /// Seconds before an idle waiting or finished lobby is removed
    #[arg(long, env = "QUIZ_LOBBY_IDLE_TTL_SECS", default_value_t = DEFAULT_IDLE_LOBBY_TTL.as_secs())]
    pub idle_lobby_ttl_secs: u64,

    /// Seconds between idle-lobby sweeps
    #[arg(long, env = "QUIZ_LOBBY_REAP_INTERVAL_SECS", default_value_t = 60)]
    pub reap_interval_secs: u64,

    /// Log level of the server's own targets when RUST_LOG is unset
    #[arg(long, env = "QUIZ_LOBBY_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

impl ServerConfig {
    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }

    /// Game rules, with the default settings validated
    pub fn rules(&self) -> Result<GameRules, ConfigError> {
        let default_settings = GameSettings {
            max_players: self.max_players,
            time_per_question_secs: self.time_per_question_secs,
            show_correct_answers: self.show_correct_answers,
        };
        default_settings.validate(0)?;
        Ok(GameRules {
            default_settings,
            points_per_correct_answer: self.points_per_correct_answer,
            reconnect_grace: Duration::from_secs(self.reconnect_grace_secs),
            idle_lobby_ttl: Duration::from_secs(self.idle_lobby_ttl_secs),
        })
    }

    /// The HTTP gateway, or the fixture gateway when `--games-file` is given
    pub fn gateway(&self) -> Result<Arc<dyn GameGateway>, ConfigError> {
        if let Some(path) = &self.games_file {
            tracing::info!("Serving games from '{}'", path.display());
            return Ok(Arc::new(StaticGameGateway::from_file(path)?));
        }
        let base_url = self.gateway_url.as_ref().ok_or(ConfigError::MissingGateway)?;
        tracing::info!("Using game-data service at {}", base_url);
        Ok(Arc::new(HttpGameGateway::new(
            base_url.clone(),
            self.gateway_token.clone(),
            Duration::from_secs(self.gateway_timeout_secs),
        )?))
    }

    /// Wire the in-memory store, registry, gateway and clock together
    pub fn session_context(&self) -> Result<SessionContext, ConfigError> {
        Ok(SessionContext::new(
            Arc::new(InMemoryLobbyRepository::new()),
            ConnectionRegistry::new(),
            self.gateway()?,
            Arc::new(SystemClock),
            self.rules()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        ServerConfig::try_parse_from(std::iter::once("quiz-lobby-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        // テスト項目: 引数なしでは既定値が使われる
        // when (操作):
        let config = parse(&["--gateway-url", "http://localhost:3000"]);

        // then (期待する結果):
        assert_eq!(config.addr(), "127.0.0.1:8080");
        let rules = config.rules().unwrap();
        assert_eq!(rules.default_settings, GameSettings::default());
        assert_eq!(rules.points_per_correct_answer, 10);
        assert_eq!(rules.reconnect_grace, Duration::from_secs(5));
        assert_eq!(rules.idle_lobby_ttl, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_overrides() {
        // テスト項目: フラグで設定を上書きできる
        // when (操作):
        let config = parse(&[
            "--port",
            "9000",
            "--gateway-url",
            "http://localhost:3000",
            "--max-players",
            "10",
            "--time-per-question-secs",
            "0",
            "--show-correct-answers",
            "false",
            "--points-per-correct-answer",
            "100",
        ]);

        // then (期待する結果):
        let rules = config.rules().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(rules.default_settings.max_players, 10);
        assert_eq!(rules.default_settings.time_per_question_secs, 0);
        assert!(!rules.default_settings.show_correct_answers);
        assert_eq!(rules.points_per_correct_answer, 100);
    }

    #[test]
    fn test_invalid_default_capacity() {
        // テスト項目: 定員 1 の既定設定は拒否される
        // when (操作):
        let config = parse(&["--gateway-url", "http://localhost:3000", "--max-players", "1"]);

        // then (期待する結果):
        assert!(matches!(config.rules(), Err(ConfigError::InvalidDefaults(_))));
    }

    #[test]
    fn test_gateway_is_required() {
        // テスト項目: ゲームデータの取得先がなければ設定エラー
        // when (操作):
        let config = parse(&[]);

        // then (期待する結果):
        assert!(matches!(config.gateway(), Err(ConfigError::MissingGateway)));
    }

    #[test]
    fn test_games_file_conflicts_with_gateway_url() {
        // テスト項目: --games-file と --gateway-url は同時に指定できない
        // when (操作):
        let result = ServerConfig::try_parse_from([
            "quiz-lobby-server",
            "--gateway-url",
            "http://localhost:3000",
            "--games-file",
            "games.json",
        ]);

        // then (期待する結果):
        assert!(result.is_err());
    }
}

//! Domain layer for the quiz lobby.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod clock;
pub mod entity;
pub mod error;
pub mod factory;
pub mod gateway;
pub mod repository;
pub mod value_object;

pub use clock::Clock;
#[cfg(test)]
pub use clock::MockClock;
pub use entity::{
    Advance, AnswerRecord, AnswerStat, CloseTarget, GameSettings, JoinOutcome, LastAnswer,
    LeaderboardEntry, LeaderboardReveal, LeaveOutcome, Lobby, LobbyState, Player, Question,
    QuestionSummary, SettingsPatch,
};
pub use error::{GatewayError, LobbyError, RepositoryError, ValueObjectError};
pub use factory::{ConnectionIdFactory, LobbyCodeFactory, PlayerIdFactory};
pub use gateway::{GameDefinition, GameGateway, GameResults};
#[cfg(test)]
pub use gateway::MockGameGateway;
pub use repository::{LobbyHandle, LobbyRepository};
pub use value_object::{
    ConnectionId, DisplayName, GameId, LobbyCode, LobbyKey, PlayerId, Timestamp,
};

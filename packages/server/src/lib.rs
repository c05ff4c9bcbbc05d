//! Real-time quiz lobby and game-session coordinator.
//!
//! Players join lobbies over WebSocket, the host starts a game whose questions
//! come from an external game-data service, and the server runs the question
//! countdowns, checks answers, keeps the scores and broadcasts the rankings.
//!
//! Layers follow the usual direction of dependencies:
//! `ui` → `usecase` → `domain` ← `infrastructure`.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use ui::{run, serve};

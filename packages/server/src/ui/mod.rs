//! WebSocket / HTTP interface of the quiz lobby server.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{ServerError, create_router, run, serve};

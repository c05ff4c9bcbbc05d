//! Infrastructure 層
//!
//! ドメイン層が定義する trait（Repository, GameGateway, Clock）の実装と、
//! WebSocket 接続の管理・ブロードキャスト、問題ごとのカウントダウンを提供します。

pub mod clock;
pub mod connection;
pub mod dto;
pub mod gateway;
pub mod repository;
pub mod timer;

pub use clock::SystemClock;
pub use connection::{Binding, ConnectionRegistry};
pub use gateway::{HttpGameGateway, StaticGameGateway};
pub use repository::InMemoryLobbyRepository;
pub use timer::QuestionTimers;

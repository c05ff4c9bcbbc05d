//! UseCase 層
//!
//! WebSocket のイベントごとに 1 つのユースケースがあり、対象のロビーをロックして
//! ドメインの操作とイベントの配信を行います。

pub mod advance_question;
pub mod close_question;
pub mod context;
pub mod disconnect_player;
pub mod error;
pub mod finish_game;
pub mod join_lobby;
pub mod kick_player;
pub mod leave_lobby;
pub mod players_list;
mod question;
pub mod reap_idle_lobbies;
pub mod set_ready;
pub mod show_results;
pub mod start_game;
pub mod submit_answer;
#[cfg(test)]
pub(crate) mod test_support;
pub mod update_settings;

pub use advance_question::AdvanceQuestionUseCase;
pub use close_question::{CloseQuestionUseCase, LeaderboardView};
pub use context::{GameRules, SessionContext};
pub use disconnect_player::DisconnectPlayerUseCase;
pub use error::UseCaseError;
pub use finish_game::FinishGameUseCase;
pub use join_lobby::{JoinLobbyUseCase, JoinRequest, JoinedLobby};
pub use kick_player::KickPlayerUseCase;
pub use leave_lobby::LeaveLobbyUseCase;
pub use players_list::PlayersListUseCase;
pub use reap_idle_lobbies::ReapIdleLobbiesUseCase;
pub use set_ready::SetReadyUseCase;
pub use show_results::ShowResultsUseCase;
pub use start_game::StartGameUseCase;
pub use submit_answer::{AnswerSubmission, SubmitAnswerUseCase};
pub use update_settings::UpdateSettingsUseCase;

//! WebSocket message DTOs for the quiz lobby.
//!
//! Every frame is a JSON text frame shaped `{"event": "<name>", "data": {...}}`.
//! Event names are kebab-case and payload fields camelCase.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{
    AnswerStat, GameSettings, LeaderboardEntry, Lobby, Player, Question, SettingsPatch,
};

/// Events a client may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinLobby(JoinLobbyPayload),
    /// Game screen socket taking over an existing seat
    JoinGameSession(JoinLobbyPayload),
    StartGame(StartGamePayload),
    KickPlayer(KickPlayerPayload),
    UpdateGameSettings(UpdateGameSettingsPayload),
    PlayerAnswer(PlayerAnswerPayload),
    NextQuestionCommand(QuestionCommandPayload),
    ShowAnswerStats(QuestionCommandPayload),
    ShowLeaderboardCommand(QuestionCommandPayload),
    ShowClassificationCommand(QuestionCommandPayload),
    TimeUp(QuestionCommandPayload),
    RequestPlayersList(LobbyRefPayload),
    GameFinishedCommand(LobbyRefPayload),
    /// Host leaves the final leaderboard for the podium
    GameEnded(LobbyRefPayload),
    SetReady(SetReadyPayload),
}

impl ClientEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinLobby(_) => "join-lobby",
            ClientEvent::JoinGameSession(_) => "join-game-session",
            ClientEvent::StartGame(_) => "start-game",
            ClientEvent::KickPlayer(_) => "kick-player",
            ClientEvent::UpdateGameSettings(_) => "update-game-settings",
            ClientEvent::PlayerAnswer(_) => "player-answer",
            ClientEvent::NextQuestionCommand(_) => "next-question-command",
            ClientEvent::ShowAnswerStats(_) => "show-answer-stats",
            ClientEvent::ShowLeaderboardCommand(_) => "show-leaderboard-command",
            ClientEvent::ShowClassificationCommand(_) => "show-classification-command",
            ClientEvent::TimeUp(_) => "time-up",
            ClientEvent::RequestPlayersList(_) => "request-players-list",
            ClientEvent::GameFinishedCommand(_) => "game-finished-command",
            ClientEvent::GameEnded(_) => "game-ended",
            ClientEvent::SetReady(_) => "set-ready",
        }
    }
}

/// Lobby reference carried by most client events.
///
/// Either `lobbyKey` or `gameId` + `lobbyCode`; when neither is present the
/// lobby the connection joined is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRefPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    pub game_id: Option<String>,
    #[serde(default)]
    pub lobby_code: Option<String>,
    #[serde(default)]
    pub lobby_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyPayload {
    #[serde(deserialize_with = "required_string_or_number")]
    pub game_id: String,
    #[serde(default)]
    pub lobby_code: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGamePayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    #[serde(default)]
    pub game_settings: Option<GameSettingsDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickPlayerPayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    #[serde(deserialize_with = "required_string_or_number")]
    pub player_id_to_kick: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameSettingsPayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    pub settings: GameSettingsDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnswerPayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    #[serde(default, deserialize_with = "string_or_number")]
    pub player_id: Option<String>,
    pub question_index: usize,
    pub answer: usize,
    /// Seconds the client believes are left; only used for untimed questions
    #[serde(default)]
    pub time_left: Option<f64>,
    // `playerName` and `isCorrect` are accepted and ignored
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCommandPayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    #[serde(default)]
    pub question_index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReadyPayload {
    #[serde(flatten)]
    pub lobby: LobbyRefPayload,
    pub ready: bool,
}

/// Game settings as exchanged on the wire. Absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettingsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_correct_answers: Option<bool>,
}

impl From<&GameSettings> for GameSettingsDto {
    fn from(settings: &GameSettings) -> Self {
        Self {
            max_players: Some(settings.max_players),
            time_per_question: Some(settings.time_per_question_secs),
            show_correct_answers: Some(settings.show_correct_answers),
        }
    }
}

impl From<GameSettingsDto> for SettingsPatch {
    fn from(dto: GameSettingsDto) -> Self {
        Self {
            max_players: dto.max_players,
            time_per_question_secs: dto.time_per_question,
            show_correct_answers: dto.show_correct_answers,
        }
    }
}

/// Events the server sends
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    JoinSuccess(JoinSuccessPayload),
    JoinError(ErrorPayload),
    LobbyUpdated(LobbyUpdatedPayload),
    PlayersUpdated(PlayersPayload),
    PlayerKicked(PlayerKickedPayload),
    SettingsUpdated(SettingsUpdatedPayload),
    GameStarted(GameStartedPayload),
    NextQuestion(NextQuestionPayload),
    PlayerAnswered(PlayerAnsweredPayload),
    AnswerStatsReady(AnswerStatsPayload),
    ShowClassification(LeaderboardPayload),
    ShowLeaderboard(LeaderboardPayload),
    GameEnded(LeaderboardPayload),
    GameFinished(EmptyPayload),
    StartError(ErrorPayload),
    ActionError(ActionErrorPayload),
    LobbyClosed(LobbyClosedPayload),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::JoinSuccess(_) => "join-success",
            ServerEvent::JoinError(_) => "join-error",
            ServerEvent::LobbyUpdated(_) => "lobby-updated",
            ServerEvent::PlayersUpdated(_) => "players-updated",
            ServerEvent::PlayerKicked(_) => "player-kicked",
            ServerEvent::SettingsUpdated(_) => "settings-updated",
            ServerEvent::GameStarted(_) => "game-started",
            ServerEvent::NextQuestion(_) => "next-question",
            ServerEvent::PlayerAnswered(_) => "player-answered",
            ServerEvent::AnswerStatsReady(_) => "answer-stats-ready",
            ServerEvent::ShowClassification(_) => "show-classification",
            ServerEvent::ShowLeaderboard(_) => "show-leaderboard",
            ServerEvent::GameEnded(_) => "game-ended",
            ServerEvent::GameFinished(_) => "game-finished",
            ServerEvent::StartError(_) => "start-error",
            ServerEvent::ActionError(_) => "action-error",
            ServerEvent::LobbyClosed(_) => "lobby-closed",
        }
    }

    /// `lobby-updated` for the current roster
    pub fn lobby_updated(lobby: &Lobby) -> Self {
        ServerEvent::LobbyUpdated(LobbyUpdatedPayload {
            players: PlayerDto::roster(lobby),
            game_started: lobby.has_started(),
            state: lobby.state().to_string(),
        })
    }

    /// `players-updated` for the current roster
    pub fn players_updated(lobby: &Lobby) -> Self {
        ServerEvent::PlayersUpdated(PlayersPayload {
            players: PlayerDto::roster(lobby),
        })
    }
}

/// Player as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub score: u32,
    pub has_answered: bool,
}

impl PlayerDto {
    fn from_player(player: &Player, lobby: &Lobby) -> Self {
        Self {
            id: player.id.as_str().to_string(),
            name: player.display_name.as_str().to_string(),
            is_host: player.is_host,
            ready: player.ready,
            score: player.score,
            has_answered: lobby.answers().iter().any(|a| a.player_id == player.id),
        }
    }

    /// All players in join order
    pub fn roster(lobby: &Lobby) -> Vec<Self> {
        lobby
            .players()
            .iter()
            .map(|p| Self::from_player(p, lobby))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuccessPayload {
    pub lobby_key: String,
    pub game_id: String,
    pub lobby_code: String,
    pub player_id: String,
    pub is_host: bool,
    pub reconnected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionErrorPayload {
    pub action: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyUpdatedPayload {
    pub players: Vec<PlayerDto>,
    pub game_started: bool,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersPayload {
    pub players: Vec<PlayerDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKickedPayload {
    pub message: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatedPayload {
    pub settings: GameSettingsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    pub game_id: String,
    pub lobby_code: String,
    pub players: Vec<PlayerDto>,
    pub game_settings: GameSettingsDto,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub text: String,
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<&Question> for QuestionDto {
    fn from(question: &Question) -> Self {
        Self {
            text: question.text.clone(),
            choices: question.choices.clone(),
            image: question.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionPayload {
    pub question_index: usize,
    pub total_questions: usize,
    pub game_settings: GameSettingsDto,
    /// Seconds in the answer window; absent when untimed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    pub question: QuestionDto,
    /// Only sent to the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnsweredPayload {
    pub player_id: String,
    pub player_name: String,
    pub question_index: usize,
    pub time_left: u32,
    /// Only when the lobby reveals correctness right away
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStatDto {
    pub answer_index: usize,
    pub count: usize,
    pub percentage: u32,
}

impl From<&AnswerStat> for AnswerStatDto {
    fn from(stat: &AnswerStat) -> Self {
        Self {
            answer_index: stat.answer_index,
            count: stat.count,
            percentage: stat.percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStatsPayload {
    pub answer_stats: Vec<AnswerStatDto>,
    pub correct_answer_index: usize,
    pub question_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub player_id: String,
    pub name: String,
    pub score: u32,
    pub position: usize,
}

impl From<&LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            player_id: entry.player_id.as_str().to_string(),
            name: entry.display_name.as_str().to_string(),
            score: entry.score,
            position: entry.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    pub leaderboard: Vec<LeaderboardEntryDto>,
}

impl LeaderboardPayload {
    pub fn from_lobby(lobby: &Lobby, question_index: Option<usize>) -> Self {
        Self {
            question_index,
            leaderboard: lobby.leaderboard().iter().map(Into::into).collect(),
        }
    }
}

/// Serializes as `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyPayload {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyClosedPayload {
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Integer(n) => n.to_string(),
            StringOrNumber::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

/// Ids may arrive as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

fn required_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

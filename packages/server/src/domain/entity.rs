//! Core domain models for the quiz lobby.
//!
//! [`Lobby`] owns every rule of the lobby/game state machine. It is plain
//! synchronous data: use cases lock it, call one method, and broadcast what
//! the method returned.

use std::fmt;
use std::time::Duration;

use super::{
    error::LobbyError,
    value_object::{ConnectionId, DisplayName, LobbyKey, PlayerId, Timestamp},
};

/// Default maximum number of players allowed in a lobby
pub const DEFAULT_MAX_PLAYERS: usize = 6;

/// Default answer window in seconds
pub const DEFAULT_TIME_PER_QUESTION_SECS: u32 = 30;

/// Minimum number of players (host included) required to start a game
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Upper bound for `max_players`
pub const MAX_PLAYERS_LIMIT: usize = 50;

/// Lobby configuration chosen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    /// Capacity of the lobby, host included
    pub max_players: usize,
    /// Answer window per question; 0 means unlimited
    pub time_per_question_secs: u32,
    /// Reveal correctness right after each answer and skip the stats screen
    pub show_correct_answers: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            time_per_question_secs: DEFAULT_TIME_PER_QUESTION_SECS,
            show_correct_answers: true,
        }
    }
}

impl GameSettings {
    /// Validate the settings against the current occupancy of a lobby.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::InvalidSettings` when `max_players` is below 2,
    /// above [`MAX_PLAYERS_LIMIT`], or below `current_players`.
    pub fn validate(&self, current_players: usize) -> Result<(), LobbyError> {
        if self.max_players < MIN_PLAYERS_TO_START {
            return Err(LobbyError::InvalidSettings(format!(
                "maxPlayers must be at least {MIN_PLAYERS_TO_START} (got {})",
                self.max_players
            )));
        }
        if self.max_players > MAX_PLAYERS_LIMIT {
            return Err(LobbyError::InvalidSettings(format!(
                "maxPlayers cannot exceed {MAX_PLAYERS_LIMIT} (got {})",
                self.max_players
            )));
        }
        if self.max_players < current_players {
            return Err(LobbyError::InvalidSettings(format!(
                "maxPlayers ({}) cannot be lower than the current number of players ({current_players})",
                self.max_players
            )));
        }
        Ok(())
    }

    /// Answer window, or `None` when questions are untimed.
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_per_question_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.time_per_question_secs)))
    }

    /// Overlay the fields present in `patch`
    pub fn merged(&self, patch: &SettingsPatch) -> GameSettings {
        GameSettings {
            max_players: patch.max_players.unwrap_or(self.max_players),
            time_per_question_secs: patch
                .time_per_question_secs
                .unwrap_or(self.time_per_question_secs),
            show_correct_answers: patch
                .show_correct_answers
                .unwrap_or(self.show_correct_answers),
        }
    }
}

/// Partial settings sent by the host; absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub max_players: Option<usize>,
    pub time_per_question_secs: Option<u32>,
    pub show_correct_answers: Option<bool>,
}

/// Phase of a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LobbyState {
    Waiting,
    Playing,
    ShowingStats,
    ShowingLeaderboard,
    Finished,
}

impl LobbyState {
    /// Wire/display name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            LobbyState::Waiting => "WAITING",
            LobbyState::Playing => "PLAYING",
            LobbyState::ShowingStats => "SHOWING_STATS",
            LobbyState::ShowingLeaderboard => "SHOWING_LEADERBOARD",
            LobbyState::Finished => "FINISHED",
        }
    }

    /// Whether a question index is meaningful in this state
    pub fn is_in_game(&self) -> bool {
        matches!(
            self,
            LobbyState::Playing | LobbyState::ShowingStats | LobbyState::ShowingLeaderboard
        )
    }
}

impl fmt::Display for LobbyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multiple-choice question as served by the game-data gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub choices: Vec<String>,
    pub image: Option<String>,
    pub correct_choice_index: usize,
}

impl Question {
    /// Create a new question.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::InvalidQuestion` when there are fewer than two
    /// choices or the correct index does not point at one of them.
    pub fn new(
        text: String,
        choices: Vec<String>,
        image: Option<String>,
        correct_choice_index: usize,
    ) -> Result<Self, LobbyError> {
        if choices.len() < 2 {
            return Err(LobbyError::InvalidQuestion(format!(
                "'{text}' needs at least 2 choices (got {})",
                choices.len()
            )));
        }
        if correct_choice_index >= choices.len() {
            return Err(LobbyError::InvalidQuestion(format!(
                "'{text}' marks choice {correct_choice_index} as correct but has {} choices",
                choices.len()
            )));
        }
        Ok(Self {
            text,
            choices,
            image,
            correct_choice_index,
        })
    }
}

/// The last answer a player gave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastAnswer {
    pub question_index: usize,
    pub choice_index: usize,
    pub is_correct: bool,
    pub time_remaining_secs: u32,
}

/// Represents a participant in a lobby
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier, survives reconnects
    pub id: PlayerId,
    pub display_name: DisplayName,
    /// Current transport connection, replaced on reconnect
    pub connection_id: ConnectionId,
    pub is_host: bool,
    pub ready: bool,
    pub score: u32,
    pub last_answer: Option<LastAnswer>,
    pub joined_at: Timestamp,
}

impl Player {
    /// Create a new player with a zero score
    pub fn new(
        id: PlayerId,
        display_name: DisplayName,
        connection_id: ConnectionId,
        is_host: bool,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            connection_id,
            is_host,
            ready: true,
            score: 0,
            last_answer: None,
            joined_at,
        }
    }
}

/// One answer to the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub player_id: PlayerId,
    pub choice_index: usize,
    pub is_correct: bool,
    pub time_remaining_secs: u32,
}

/// Share of answers that picked one choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerStat {
    pub answer_index: usize,
    pub count: usize,
    /// Rounded percentage of all answers given
    pub percentage: u32,
}

/// Result of closing a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub question_index: usize,
    pub answer_stats: Vec<AnswerStat>,
    pub correct_choice_index: usize,
}

/// A row of the competitive leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub display_name: DisplayName,
    pub score: u32,
    /// 1-based rank
    pub position: usize,
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub player: Player,
    pub reconnected: bool,
    /// Connection the player was bound to before this reconnect
    pub previous_connection: Option<ConnectionId>,
}

/// Result of removing a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub removed: Player,
    /// Player that inherited the host role, if the host left
    pub promoted_host: Option<PlayerId>,
}

/// Where a closing question leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTarget {
    /// Leaderboard when `show_correct_answers`, stats otherwise
    FromSettings,
    Stats,
    Leaderboard,
}

/// Result of the host moving past the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextQuestion(usize),
    Finished,
}

/// Result of the host asking for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardReveal {
    /// The question was still open and has just been closed
    ClosedQuestion(QuestionSummary),
    /// Stats were showing; moved on to the leaderboard
    FromStats,
    /// Leaderboard was already showing
    AlreadyShowing,
}

/// Represents a lobby: its roster, settings and game progress
#[derive(Debug, Clone)]
pub struct Lobby {
    key: LobbyKey,
    /// Insertion order is join order
    players: Vec<Player>,
    settings: GameSettings,
    state: LobbyState,
    current_question_index: usize,
    questions: Vec<Question>,
    /// Answers to the current question only
    answers: Vec<AnswerRecord>,
    question_opened_at: Option<Timestamp>,
    /// Answer window of the open question, fixed when it opened
    question_time_limit_secs: u32,
    created_at: Timestamp,
    last_activity_at: Timestamp,
    results_recorded: bool,
    closed: bool,
}

impl Lobby {
    /// Create a new empty lobby
    pub fn new(key: LobbyKey, settings: GameSettings, created_at: Timestamp) -> Self {
        Self {
            key,
            players: Vec::new(),
            settings,
            state: LobbyState::Waiting,
            current_question_index: 0,
            questions: Vec::new(),
            answers: Vec::new(),
            question_opened_at: None,
            question_time_limit_secs: 0,
            created_at,
            last_activity_at: created_at,
            results_recorded: false,
            closed: false,
        }
    }

    pub fn key(&self) -> &LobbyKey {
        &self.key
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_activity_at(&self) -> Timestamp {
        self.last_activity_at
    }

    /// Time limit of the currently open question, if it is timed
    pub fn question_time_limit(&self) -> Option<Duration> {
        (self.state == LobbyState::Playing && self.question_time_limit_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.question_time_limit_secs)))
    }

    /// The question at the current index, while a game is running
    pub fn current_question(&self) -> Option<&Question> {
        if self.state.is_in_game() {
            self.questions.get(self.current_question_index)
        } else {
            None
        }
    }

    pub fn has_started(&self) -> bool {
        self.state != LobbyState::Waiting
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Closed lobbies have been removed from the store and must not be mutated
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.host().is_some_and(|host| &host.id == player_id)
    }

    /// Get a player by ID
    pub fn find_player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// Get a player by their current connection
    pub fn find_by_connection(&self, connection_id: &ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| &p.connection_id == connection_id)
    }

    /// Players who compete (everyone but the host), in join order
    pub fn competitors(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_host)
    }

    /// Record activity for idle-lobby accounting
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    /// Whether the lobby sat idle for at least `ttl` in a reapable state
    pub fn is_idle(&self, now: Timestamp, ttl: Duration) -> bool {
        let reapable = matches!(self.state, LobbyState::Waiting | LobbyState::Finished);
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        reapable && now.millis_since(self.last_activity_at) >= ttl_millis
    }

    /// Add a player, or re-associate an existing one with a new connection
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::LobbyFull` if the lobby is at capacity and
    /// `LobbyError::InvalidState` if the game already finished. Reconnects
    /// never fail.
    pub fn join(
        &mut self,
        player_id: PlayerId,
        display_name: DisplayName,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> Result<JoinOutcome, LobbyError> {
        self.touch(now);

        if let Some(existing) = self.players.iter_mut().find(|p| p.id == player_id) {
            let previous = std::mem::replace(&mut existing.connection_id, connection_id);
            let previous_connection = (previous != existing.connection_id).then_some(previous);
            return Ok(JoinOutcome {
                player: existing.clone(),
                reconnected: true,
                previous_connection,
            });
        }

        if self.state == LobbyState::Finished {
            return Err(self.invalid_state("join"));
        }
        if self.players.len() >= self.settings.max_players {
            return Err(LobbyError::LobbyFull {
                capacity: self.settings.max_players,
                current: self.players.len(),
            });
        }

        let is_host = self.players.is_empty();
        let player = Player::new(player_id, display_name, connection_id, is_host, now);
        self.players.push(player.clone());
        Ok(JoinOutcome {
            player,
            reconnected: false,
            previous_connection: None,
        })
    }

    /// Remove the player bound to `connection_id`
    ///
    /// When the host leaves, the earliest-joined remaining player becomes host.
    /// Returns `None` if no player uses that connection (e.g. it reconnected
    /// elsewhere in the meantime).
    pub fn leave(&mut self, connection_id: &ConnectionId, now: Timestamp) -> Option<LeaveOutcome> {
        let index = self
            .players
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        self.touch(now);
        Some(self.remove_at(index))
    }

    fn remove_at(&mut self, index: usize) -> LeaveOutcome {
        let removed = self.players.remove(index);
        let promoted_host = if removed.is_host {
            self.players.first_mut().map(|next| {
                next.is_host = true;
                next.id.clone()
            })
        } else {
            None
        };
        LeaveOutcome {
            removed,
            promoted_host,
        }
    }

    /// Remove `target` on behalf of the host
    ///
    /// # Errors
    ///
    /// `NotHost` when the requester is not the host, `CannotKickSelf` when the
    /// host targets themselves, `PlayerNotFound` when the target is absent.
    pub fn kick(
        &mut self,
        requester: &PlayerId,
        target: &PlayerId,
        now: Timestamp,
    ) -> Result<Player, LobbyError> {
        self.ensure_host(requester)?;
        if requester == target {
            return Err(LobbyError::CannotKickSelf);
        }
        let index = self
            .players
            .iter()
            .position(|p| &p.id == target)
            .ok_or_else(|| LobbyError::PlayerNotFound(target.to_string()))?;
        self.touch(now);
        Ok(self.remove_at(index).removed)
    }

    /// Update the readiness flag of the player on `connection_id`
    pub fn set_ready(
        &mut self,
        connection_id: &ConnectionId,
        ready: bool,
        now: Timestamp,
    ) -> Result<&Player, LobbyError> {
        self.touch(now);
        let player = self
            .players
            .iter_mut()
            .find(|p| &p.connection_id == connection_id)
            .ok_or_else(|| LobbyError::PlayerNotFound(connection_id.to_string()))?;
        player.ready = ready;
        Ok(player)
    }

    /// Replace the settings on behalf of the host
    ///
    /// A new time limit applies from the next question on.
    pub fn update_settings(
        &mut self,
        requester: &PlayerId,
        settings: GameSettings,
        now: Timestamp,
    ) -> Result<(), LobbyError> {
        self.ensure_host(requester)?;
        if !matches!(self.state, LobbyState::Waiting | LobbyState::Playing) {
            return Err(self.invalid_state("update settings"));
        }
        settings.validate(self.players.len())?;
        self.settings = settings;
        self.touch(now);
        Ok(())
    }

    /// Check the start preconditions without changing anything
    ///
    /// Called before fetching questions so that a doomed start never reaches
    /// the gateway.
    pub fn ensure_can_start(
        &self,
        requester: &PlayerId,
        settings: Option<&GameSettings>,
    ) -> Result<(), LobbyError> {
        self.ensure_host(requester)?;
        if self.state != LobbyState::Waiting {
            return Err(self.invalid_state("start the game"));
        }
        let settings = settings.unwrap_or(&self.settings);
        settings.validate(0)?;
        if self.players.len() < MIN_PLAYERS_TO_START {
            return Err(LobbyError::NotEnoughPlayers {
                required: MIN_PLAYERS_TO_START,
                current: self.players.len(),
            });
        }
        if self.players.len() > settings.max_players {
            return Err(LobbyError::OverCapacity {
                capacity: settings.max_players,
                current: self.players.len(),
            });
        }
        Ok(())
    }

    /// Move from WAITING to PLAYING and open the first question
    pub fn start(
        &mut self,
        requester: &PlayerId,
        settings: Option<GameSettings>,
        questions: Vec<Question>,
        now: Timestamp,
    ) -> Result<(), LobbyError> {
        self.ensure_can_start(requester, settings.as_ref())?;
        if questions.is_empty() {
            return Err(LobbyError::NoQuestions);
        }
        if let Some(settings) = settings {
            self.settings = settings;
        }
        self.questions = questions;
        for player in &mut self.players {
            player.score = 0;
            player.last_answer = None;
        }
        self.begin_question(0, now);
        Ok(())
    }

    fn begin_question(&mut self, index: usize, now: Timestamp) {
        self.state = LobbyState::Playing;
        self.current_question_index = index;
        self.answers.clear();
        self.question_opened_at = Some(now);
        self.question_time_limit_secs = self.settings.time_per_question_secs;
        self.touch(now);
    }

    /// Seconds left in the open question's window, `None` when untimed
    pub fn time_remaining_secs(&self, now: Timestamp) -> Option<u32> {
        let opened_at = self.question_opened_at?;
        if self.question_time_limit_secs == 0 {
            return None;
        }
        let limit_millis = u64::from(self.question_time_limit_secs) * 1000;
        let remaining = limit_millis.saturating_sub(now.millis_since(opened_at));
        Some(u32::try_from(remaining.div_ceil(1000)).unwrap_or(u32::MAX))
    }

    /// Record an answer and award points for a correct choice
    ///
    /// Correctness is computed from the question data; the client's view of
    /// it is never consulted. `client_time_remaining` is only used when the
    /// question is untimed.
    pub fn submit_answer(
        &mut self,
        player_id: &PlayerId,
        question_index: usize,
        choice_index: usize,
        client_time_remaining: Option<u32>,
        points_per_correct_answer: u32,
        now: Timestamp,
    ) -> Result<AnswerRecord, LobbyError> {
        if self.state != LobbyState::Playing {
            return Err(self.invalid_state("answer"));
        }
        let player = self
            .find_player(player_id)
            .ok_or_else(|| LobbyError::PlayerNotFound(player_id.to_string()))?;
        if player.is_host {
            return Err(LobbyError::HostCannotAnswer);
        }
        if question_index != self.current_question_index {
            return Err(LobbyError::QuestionMismatch {
                requested: question_index,
                current: self.current_question_index,
            });
        }
        if self.answers.iter().any(|a| &a.player_id == player_id) {
            return Err(LobbyError::AlreadyAnswered {
                player_id: player_id.to_string(),
                question_index,
            });
        }
        let question = self
            .questions
            .get(question_index)
            .ok_or(LobbyError::NoQuestions)?;
        if choice_index >= question.choices.len() {
            return Err(LobbyError::ChoiceOutOfRange {
                choice: choice_index,
                available: question.choices.len(),
            });
        }

        let is_correct = choice_index == question.correct_choice_index;
        let time_remaining_secs = self
            .time_remaining_secs(now)
            .unwrap_or_else(|| client_time_remaining.unwrap_or(0));
        let record = AnswerRecord {
            player_id: player_id.clone(),
            choice_index,
            is_correct,
            time_remaining_secs,
        };

        if let Some(player) = self.players.iter_mut().find(|p| &p.id == player_id) {
            if is_correct {
                player.score = player.score.saturating_add(points_per_correct_answer);
            }
            player.last_answer = Some(LastAnswer {
                question_index,
                choice_index,
                is_correct,
                time_remaining_secs,
            });
        }
        self.answers.push(record.clone());
        self.touch(now);
        Ok(record)
    }

    /// Whether every competitor still in the lobby answered the open question
    pub fn all_answered(&self) -> bool {
        self.state == LobbyState::Playing
            && self
                .competitors()
                .all(|p| self.answers.iter().any(|a| a.player_id == p.id))
    }

    /// Per-choice counts and percentages for the current question
    pub fn answer_stats(&self) -> Vec<AnswerStat> {
        let Some(question) = self.questions.get(self.current_question_index) else {
            return Vec::new();
        };
        let total = self.answers.len();
        (0..question.choices.len())
            .map(|answer_index| {
                let count = self
                    .answers
                    .iter()
                    .filter(|a| a.choice_index == answer_index)
                    .count();
                AnswerStat {
                    answer_index,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect()
    }

    /// Stats and correct answer of the current question
    pub fn question_summary(&self) -> Option<QuestionSummary> {
        let question = self.current_question()?;
        Some(QuestionSummary {
            question_index: self.current_question_index,
            answer_stats: self.answer_stats(),
            correct_choice_index: question.correct_choice_index,
        })
    }

    /// Close the open question `question_index`
    ///
    /// # Errors
    ///
    /// `InvalidState` unless PLAYING, `QuestionMismatch` when `question_index`
    /// is not the open question. Callers holding a stale index (a late timer)
    /// treat both as a no-op.
    pub fn close_question(
        &mut self,
        question_index: usize,
        target: CloseTarget,
        now: Timestamp,
    ) -> Result<QuestionSummary, LobbyError> {
        if self.state != LobbyState::Playing {
            return Err(self.invalid_state("close the question"));
        }
        if question_index != self.current_question_index {
            return Err(LobbyError::QuestionMismatch {
                requested: question_index,
                current: self.current_question_index,
            });
        }
        self.state = match target {
            CloseTarget::FromSettings if self.settings.show_correct_answers => {
                LobbyState::ShowingLeaderboard
            }
            CloseTarget::FromSettings | CloseTarget::Stats => LobbyState::ShowingStats,
            CloseTarget::Leaderboard => LobbyState::ShowingLeaderboard,
        };
        self.question_opened_at = None;
        self.touch(now);
        self.question_summary()
            .ok_or_else(|| self.invalid_state("close the question"))
    }

    /// Host asks for the answer stats
    ///
    /// Closes the open question into SHOWING_STATS, or re-reads the stats when
    /// they are already showing.
    pub fn reveal_stats(
        &mut self,
        requester: &PlayerId,
        now: Timestamp,
    ) -> Result<QuestionSummary, LobbyError> {
        self.ensure_host(requester)?;
        match self.state {
            LobbyState::Playing => {
                self.close_question(self.current_question_index, CloseTarget::Stats, now)
            }
            LobbyState::ShowingStats => self
                .question_summary()
                .ok_or_else(|| self.invalid_state("show answer stats")),
            _ => Err(self.invalid_state("show answer stats")),
        }
    }

    /// Host asks for the leaderboard
    pub fn reveal_leaderboard(
        &mut self,
        requester: &PlayerId,
        now: Timestamp,
    ) -> Result<LeaderboardReveal, LobbyError> {
        self.ensure_host(requester)?;
        match self.state {
            LobbyState::Playing => self
                .close_question(self.current_question_index, CloseTarget::Leaderboard, now)
                .map(LeaderboardReveal::ClosedQuestion),
            LobbyState::ShowingStats => {
                self.state = LobbyState::ShowingLeaderboard;
                self.touch(now);
                Ok(LeaderboardReveal::FromStats)
            }
            LobbyState::ShowingLeaderboard => Ok(LeaderboardReveal::AlreadyShowing),
            _ => Err(self.invalid_state("show the leaderboard")),
        }
    }

    /// Host moves on from the leaderboard
    ///
    /// `expected_index` is the index the host's client believes comes next;
    /// a mismatch means the command is stale (double click, duplicated frame).
    pub fn advance(
        &mut self,
        requester: &PlayerId,
        expected_index: Option<usize>,
        now: Timestamp,
    ) -> Result<Advance, LobbyError> {
        self.ensure_host(requester)?;
        if self.state != LobbyState::ShowingLeaderboard {
            return Err(self.invalid_state("advance to the next question"));
        }
        let next = self.current_question_index + 1;
        if let Some(expected) = expected_index
            && expected != next
        {
            return Err(LobbyError::QuestionMismatch {
                requested: expected,
                current: next,
            });
        }
        if next >= self.questions.len() {
            self.state = LobbyState::Finished;
            self.touch(now);
            return Ok(Advance::Finished);
        }
        self.begin_question(next, now);
        Ok(Advance::NextQuestion(next))
    }

    /// Host ends the game. Returns whether a game had been played.
    pub fn finish(&mut self, requester: &PlayerId, now: Timestamp) -> Result<bool, LobbyError> {
        self.ensure_host(requester)?;
        let played = self.has_started();
        self.state = LobbyState::Finished;
        self.question_opened_at = None;
        self.touch(now);
        Ok(played)
    }

    /// Competitors sorted by score, ties broken by join order
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut competitors: Vec<&Player> = self.competitors().collect();
        // stable: equal scores keep join order
        competitors.sort_by(|a, b| b.score.cmp(&a.score));
        competitors
            .into_iter()
            .enumerate()
            .map(|(index, p)| LeaderboardEntry {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
                position: index + 1,
            })
            .collect()
    }

    /// Flag the final results as persisted. Returns `false` if they already were.
    pub fn mark_results_recorded(&mut self) -> bool {
        !std::mem::replace(&mut self.results_recorded, true)
    }

    fn ensure_host(&self, requester: &PlayerId) -> Result<(), LobbyError> {
        if self.is_host(requester) {
            Ok(())
        } else {
            Err(LobbyError::NotHost(requester.to_string()))
        }
    }

    fn invalid_state(&self, action: &str) -> LobbyError {
        LobbyError::InvalidState {
            action: action.to_string(),
            state: self.state.to_string(),
        }
    }
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (count * 100 + total / 2) / total;
    u32::try_from(rounded).unwrap_or(100)
}

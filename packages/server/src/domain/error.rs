//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// GameId validation error
    #[error("GameId cannot be empty")]
    GameIdEmpty,

    /// GameId too long error
    #[error("GameId cannot exceed {max} characters (got {actual})")]
    GameIdTooLong { max: usize, actual: usize },

    /// GameId contains whitespace
    #[error("GameId cannot contain whitespace (got: {0:?})")]
    GameIdInvalidFormat(String),

    /// LobbyCode length error
    #[error("LobbyCode must be {min} to {max} characters (got {actual})")]
    LobbyCodeInvalidLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    /// LobbyCode invalid format error (not ASCII alphanumeric)
    #[error("LobbyCode must be ASCII alphanumeric (got: {0:?})")]
    LobbyCodeInvalidFormat(String),

    /// Serialized lobby key could not be split into game id and code
    #[error("LobbyKey must look like \"{{gameId}}-{{lobbyCode}}\" (got: {0:?})")]
    LobbyKeyInvalidFormat(String),

    /// PlayerId validation error
    #[error("PlayerId cannot be empty")]
    PlayerIdEmpty,

    /// PlayerId too long error
    #[error("PlayerId cannot exceed {max} characters (got {actual})")]
    PlayerIdTooLong { max: usize, actual: usize },

    /// DisplayName validation error
    #[error("DisplayName cannot be empty")]
    DisplayNameEmpty,

    /// DisplayName too long error
    #[error("DisplayName cannot exceed {max} characters (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },

    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,
}

/// Errors related to Lobby domain logic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    /// Lobby capacity exceeded error
    #[error("Lobby is full: maximum {capacity} players allowed (current: {current})")]
    LobbyFull { capacity: usize, current: usize },

    /// Requester is not the host of the lobby
    #[error("Player '{0}' is not the host of this lobby")]
    NotHost(String),

    /// Host tried to kick themselves
    #[error("The host cannot kick themselves")]
    CannotKickSelf,

    /// Player not found in the lobby
    #[error("Player '{0}' is not in this lobby")]
    PlayerNotFound(String),

    /// Settings rejected
    #[error("Invalid game settings: {0}")]
    InvalidSettings(String),

    /// Not enough players to start
    #[error("At least {required} players are required to start (current: {current})")]
    NotEnoughPlayers { required: usize, current: usize },

    /// More players than the configured capacity
    #[error("Too many players to start: maximum {capacity} allowed (current: {current})")]
    OverCapacity { capacity: usize, current: usize },

    /// Operation not allowed in the current lobby state
    #[error("Cannot {action} while the lobby is {state}")]
    InvalidState { action: String, state: String },

    /// Player already answered the current question
    #[error("Player '{player_id}' already answered question {question_index}")]
    AlreadyAnswered {
        player_id: String,
        question_index: usize,
    },

    /// Host is not a competitor
    #[error("The host cannot answer questions")]
    HostCannotAnswer,

    /// Command refers to a question other than the current one
    #[error("Question {requested} is not the current question (current: {current})")]
    QuestionMismatch { requested: usize, current: usize },

    /// Choice index outside of the question's choices
    #[error("Choice {choice} is out of range (question has {available} choices)")]
    ChoiceOutOfRange { choice: usize, available: usize },

    /// Game has no questions
    #[error("The game has no questions")]
    NoQuestions,

    /// Question data is unusable
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),
}

/// Errors raised by a LobbyRepository implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Lobby not found
    #[error("Lobby '{0}' not found")]
    LobbyNotFound(String),
}

/// Errors raised by the external game-data gateway
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Gateway could not be reached or answered with a transport error
    #[error("Game gateway unavailable: {0}")]
    Unavailable(String),

    /// Game id unknown to the gateway
    #[error("Game '{0}' not found")]
    GameNotFound(String),

    /// Gateway answered with an unusable question set
    #[error("Game '{game_id}' has an invalid question set: {reason}")]
    InvalidQuestionSet { game_id: String, reason: String },
}

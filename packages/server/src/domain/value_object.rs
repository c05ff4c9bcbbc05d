//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

const MAX_ID_LEN: usize = 100;
const LOBBY_CODE_MIN_LEN: usize = 4;
const LOBBY_CODE_MAX_LEN: usize = 12;

/// Maximum number of characters in a display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Game identifier value object.
///
/// Opaque identifier of the quiz a lobby plays. Issued by the game-data
/// gateway, so the only constraints are the ones that keep it usable as a
/// key and inside a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(String);

impl GameId {
    /// Create a new GameId.
    ///
    /// # Arguments
    ///
    /// * `id` - The game identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the GameId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::GameIdEmpty);
        }
        let len = id.chars().count();
        if len > MAX_ID_LEN {
            return Err(ValueObjectError::GameIdTooLong {
                max: MAX_ID_LEN,
                actual: len,
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ValueObjectError::GameIdInvalidFormat(id));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GameId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lobby code value object.
///
/// Short human-shareable code, 4 to 12 ASCII alphanumerics. Codes never
/// contain `-`, which keeps the serialized [`LobbyKey`] unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LobbyCode(String);

impl LobbyCode {
    /// Create a new LobbyCode.
    pub fn new(code: String) -> Result<Self, ValueObjectError> {
        let len = code.chars().count();
        if !(LOBBY_CODE_MIN_LEN..=LOBBY_CODE_MAX_LEN).contains(&len) {
            return Err(ValueObjectError::LobbyCodeInvalidLength {
                min: LOBBY_CODE_MIN_LEN,
                max: LOBBY_CODE_MAX_LEN,
                actual: len,
            });
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValueObjectError::LobbyCodeInvalidFormat(code));
        }
        Ok(Self(code))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LobbyCode {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite key of a lobby: the game it plays and its code.
///
/// Sole lookup key into the lobby store. Displayed as `"{gameId}-{lobbyCode}"`,
/// which is also the room name clients see on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LobbyKey {
    game_id: GameId,
    lobby_code: LobbyCode,
}

impl LobbyKey {
    /// Create a new LobbyKey from its parts.
    pub fn new(game_id: GameId, lobby_code: LobbyCode) -> Self {
        Self {
            game_id,
            lobby_code,
        }
    }

    /// Parse a serialized key (`"{gameId}-{lobbyCode}"`).
    ///
    /// Splits on the last `-`: game ids may contain dashes, lobby codes never do.
    pub fn parse(serialized: &str) -> Result<Self, ValueObjectError> {
        let (game_id, lobby_code) = serialized
            .rsplit_once('-')
            .ok_or_else(|| ValueObjectError::LobbyKeyInvalidFormat(serialized.to_string()))?;
        Ok(Self::new(
            GameId::new(game_id.to_string())?,
            LobbyCode::new(lobby_code.to_string())?,
        ))
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn lobby_code(&self) -> &LobbyCode {
        &self.lobby_code
    }
}

impl fmt::Display for LobbyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.game_id, self.lobby_code)
    }
}

/// Player identifier value object.
///
/// Stable across reconnects: derived from the authenticated user id or a
/// guest id the client keeps in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a new PlayerId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::PlayerIdEmpty);
        }
        let len = id.chars().count();
        if len > MAX_ID_LEN {
            return Err(ValueObjectError::PlayerIdTooLong {
                max: MAX_ID_LEN,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name value object.
///
/// Surrounding whitespace is trimmed before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a new DisplayName.
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::DisplayNameEmpty);
        }
        let len = trimmed.chars().count();
        if len > MAX_DISPLAY_NAME_LEN {
            return Err(ValueObjectError::DisplayNameTooLong {
                max: MAX_DISPLAY_NAME_LEN,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport connection identifier.
///
/// Changes on every reconnect; the coordinator re-associates it with the
/// stable [`PlayerId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new ConnectionId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ConnectionIdEmpty);
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (JST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn millis_since(&self, earlier: Timestamp) -> u64 {
        u64::try_from(self.0.saturating_sub(earlier.0)).unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

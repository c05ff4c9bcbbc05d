//! Domain factories for creating identifiers the server mints itself.

use super::{ConnectionId, LobbyCode, PlayerId, error::ValueObjectError};

/// Length of server-minted lobby codes.
pub const GENERATED_LOBBY_CODE_LEN: usize = 6;

/// Factory for generating LobbyCode instances.
///
/// Used when a client opens a lobby without proposing a code.
pub struct LobbyCodeFactory;

impl LobbyCodeFactory {
    /// Generate a new upper-case alphanumeric LobbyCode from a random UUID v4.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<LobbyCode, ValueObjectError> {
        let code: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(GENERATED_LOBBY_CODE_LEN)
            .collect::<String>()
            .to_ascii_uppercase();
        LobbyCode::new(code)
    }
}

/// Factory for guest player ids, for clients that join without any identity.
pub struct PlayerIdFactory;

impl PlayerIdFactory {
    pub fn guest() -> Result<PlayerId, ValueObjectError> {
        PlayerId::new(format!("guest-{}", uuid::Uuid::new_v4()))
    }
}

/// Factory for transport connection ids.
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    pub fn generate() -> Result<ConnectionId, ValueObjectError> {
        ConnectionId::new(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_code_factory_generate() {
        // テスト項目: LobbyCodeFactory::generate() で 6 文字の大文字英数字コードを生成できる
        // when (操作):
        let result = LobbyCodeFactory::generate();

        // then (期待する結果):
        assert!(result.is_ok());
        let code = result.unwrap();
        assert_eq!(code.as_str().len(), GENERATED_LOBBY_CODE_LEN);
        assert!(
            code.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_player_id_factory_guest_uniqueness() {
        // テスト項目: ゲスト ID は毎回異なり、"guest-" で始まる
        // when (操作):
        let first = PlayerIdFactory::guest().unwrap();
        let second = PlayerIdFactory::guest().unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("guest-"));
    }

    #[test]
    fn test_connection_id_factory_generate() {
        // テスト項目: 接続 ID は UUID v4 形式で生成される
        // when (操作):
        let connection_id = ConnectionIdFactory::generate().unwrap();

        // then (期待する結果):
        assert_eq!(connection_id.as_str().len(), 36);
    }
}

//! UseCase 層のエラー定義
//!
//! ドメイン層のエラーを、クライアントへの応答方針ごとに分類します。

use thiserror::Error;

use crate::domain::{GatewayError, LobbyError, RepositoryError, ValueObjectError};

/// ユースケースのエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UseCaseError {
    /// 不正な入力・現在の状態では実行できない操作（要求元にだけ通知）
    #[error("{0}")]
    Validation(String),

    /// 定員・人数の制約違反（要求元にだけ通知）
    #[error("{0}")]
    Capacity(String),

    /// ホスト専用操作をホスト以外が実行した（通知せずログのみ）
    #[error("{0}")]
    Authorization(String),

    /// 存在しないロビー・プレイヤーへの操作（要求元にだけ通知）
    #[error("{0}")]
    NotFound(String),

    /// 外部のゲームデータサービスの障害
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl UseCaseError {
    /// クライアントに返すエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            UseCaseError::Validation(_) => "VALIDATION",
            UseCaseError::Capacity(_) => "CAPACITY",
            UseCaseError::Authorization(_) => "AUTHORIZATION",
            UseCaseError::NotFound(_) => "NOT_FOUND",
            UseCaseError::Gateway(_) => "GATEWAY",
        }
    }

    /// 要求元に通知せず破棄するエラーかどうか
    pub fn is_silent(&self) -> bool {
        matches!(self, UseCaseError::Authorization(_))
    }
}

impl From<LobbyError> for UseCaseError {
    fn from(error: LobbyError) -> Self {
        let message = error.to_string();
        match error {
            LobbyError::LobbyFull { .. }
            | LobbyError::NotEnoughPlayers { .. }
            | LobbyError::OverCapacity { .. } => UseCaseError::Capacity(message),
            LobbyError::NotHost(_) | LobbyError::CannotKickSelf => {
                UseCaseError::Authorization(message)
            }
            LobbyError::PlayerNotFound(_) => UseCaseError::NotFound(message),
            LobbyError::InvalidSettings(_)
            | LobbyError::InvalidState { .. }
            | LobbyError::AlreadyAnswered { .. }
            | LobbyError::HostCannotAnswer
            | LobbyError::QuestionMismatch { .. }
            | LobbyError::ChoiceOutOfRange { .. }
            | LobbyError::NoQuestions
            | LobbyError::InvalidQuestion(_) => UseCaseError::Validation(message),
        }
    }
}

impl From<ValueObjectError> for UseCaseError {
    fn from(error: ValueObjectError) -> Self {
        UseCaseError::Validation(error.to_string())
    }
}

impl From<RepositoryError> for UseCaseError {
    fn from(error: RepositoryError) -> Self {
        UseCaseError::NotFound(error.to_string())
    }
}

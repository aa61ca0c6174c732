use arcade_execution::EngineError;
use arcade_types::{
    Envelope, MachineConfigError, CODE_BAD_REQUEST, CODE_CONFIG, CODE_INSUFFICIENT_FUNDS,
    CODE_NOT_FOUND, CODE_RESULT_EXPIRED, CODE_SCORE_NOT_IMPROVED, CODE_STORE_UNAVAILABLE,
    CODE_VERDICT_MISMATCH, MAX_MESSAGE_LENGTH,
};
use thiserror::Error as ThisError;

/// Failure at a store, cache, or stream boundary.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Unavailable(format!("sqlite: {err}"))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(format!("redis: {err}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Failure of a game request, surfaced to the client as an `ErrorResp`.
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("configuration error: {0}")]
    Config(#[from] EngineError),
    #[error("insufficient funds (balance={balance}, price={price})")]
    InsufficientFunds { balance: i64, price: i64 },
    #[error("result for game {game_id} expired")]
    ResultExpired { game_id: i64 },
    #[error("item {item_id} is not part of game {game_id}")]
    UnknownItem { game_id: i64, item_id: i64 },
    #[error("reported outcome for item {item_id} of game {game_id} does not match")]
    VerdictMismatch { game_id: i64, item_id: i64 },
    #[error("score {proposed} does not improve on the stored score")]
    ScoreNotImproved { proposed: i64 },
    #[error("{0}")]
    StoreUnavailable(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<MachineConfigError> for SessionError {
    fn from(err: MachineConfigError) -> Self {
        Self::Config(EngineError::Config(err))
    }
}

impl SessionError {
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => CODE_BAD_REQUEST,
            Self::NotFound { .. } | Self::UnknownItem { .. } => CODE_NOT_FOUND,
            Self::Config(_) => CODE_CONFIG,
            Self::InsufficientFunds { .. } => CODE_INSUFFICIENT_FUNDS,
            Self::ResultExpired { .. } => CODE_RESULT_EXPIRED,
            Self::VerdictMismatch { .. } => CODE_VERDICT_MISMATCH,
            Self::ScoreNotImproved { .. } => CODE_SCORE_NOT_IMPROVED,
            Self::StoreUnavailable(_) => CODE_STORE_UNAVAILABLE,
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        let mut message = self.to_string();
        if message.len() > MAX_MESSAGE_LENGTH {
            let mut end = MAX_MESSAGE_LENGTH;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        Envelope::error(self.code(), message)
    }
}

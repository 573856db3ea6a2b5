use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scan not found: {0}")]
    NotFound(String),

    #[error("scan already stored: {0}")]
    AlreadyExists(String),

    #[error("invalid scan id: {0:?}")]
    InvalidId(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("insufficient credits: {available} available, 1 required")]
    InsufficientCredits { available: u32 },

    #[error("unknown credit package: {0}")]
    UnknownPackage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

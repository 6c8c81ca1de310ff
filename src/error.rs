use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No adapter registered for tool: {0}")]
    UnknownTool(String),

    #[error("Concurrency limit must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Result slot {index} recorded twice")]
    DuplicateResult { index: usize },

    #[error("Result slot {index} out of range for batch of {expected}")]
    SlotOutOfRange { index: usize, expected: usize },

    #[error("Aggregator finalized with {missing} of {expected} results missing")]
    IncompleteBatch { missing: usize, expected: usize },

    #[error("Worker task failed: {0}")]
    TaskJoin(String),

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

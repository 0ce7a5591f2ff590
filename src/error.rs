use thiserror::Error;

/// Main error type for readorder operations
#[derive(Error, Debug)]
pub enum ReadorderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Ordering check failed: {0}")]
    Validation(String),

    #[error("Content hash mismatch: expected {expected}, found {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Invalid range for `{name}`: [{start}, {end}) in a source of {len} bytes")]
    InvalidRange {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Units `{first}` and `{second}` overlap")]
    OverlappingUnits { first: String, second: String },

    #[error("Moving `{name}` would run it into the statement after it")]
    UnterminatedUnit { name: String },

    #[error("Order is not a permutation of the units: {0}")]
    OrderMismatch(String),
}

pub type Result<T> = std::result::Result<T, ReadorderError>;

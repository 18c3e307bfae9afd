use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Metadata index unavailable for {base_path}: {reason}")]
    IndexUnavailable { base_path: String, reason: String },

    #[error("Failed to decode column stats payload: {0}")]
    DecodeFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn index_unavailable(base_path: impl Into<String>, reason: impl ToString) -> Self {
        Error::IndexUnavailable {
            base_path: base_path.into(),
            reason: reason.to_string(),
        }
    }

    /// Only a single undecodable entry is worth skipping over; everything
    /// else aborts the current call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DecodeFailure(_))
    }

    pub fn error_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => -1,
            Error::IndexUnavailable { .. } => -2,
            Error::DecodeFailure(_) => -3,
            Error::Config(_) => -4,
            Error::Cancelled => -5,
            Error::Io(_) => -6,
            Error::Serialization(_) => -7,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP client error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Configuration parse error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

impl EtlError {
    /// 給使用者的修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and the dataset endpoints",
            EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the output directory exists and is writable"
            }
            EtlError::DatabaseError(_) => {
                "Check that the database path is writable and not locked by another process"
            }
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Inspect the input data; it does not have the expected shape"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags and run again"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// Internal tag kept for diagnostics only; callers never branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchCause {
    Network,
    Timeout,
    Status,
    Decode,
    Malformed,
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FetchCause::Network => "network",
            FetchCause::Timeout => "timeout",
            FetchCause::Status => "http status",
            FetchCause::Decode => "invalid json",
            FetchCause::Malformed => "malformed response",
        };
        f.write_str(tag)
    }
}

/// A page request that produced no usable body.
///
/// Network failures, non-2xx statuses, timeouts and undecodable bodies all
/// collapse into this one error; the cause only shows up in the message.
#[derive(Error, Debug, Clone)]
#[error("fetch failed ({cause}): {message}")]
pub struct FetchError {
    cause: FetchCause,
    message: String,
}

impl FetchError {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if err.is_status() {
            FetchCause::Status
        } else if err.is_decode() {
            FetchCause::Decode
        } else {
            FetchCause::Network
        };
        Self {
            cause,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self {
            cause: FetchCause::Decode,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            cause: FetchCause::Malformed,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            cause: FetchCause::Network,
            message: message.into(),
        }
    }
}

/// A single table that could not be written to a single sink.
#[derive(Error, Debug)]
#[error("{sink} sink failed for table '{table}': {source}")]
pub struct PersistError {
    pub sink: &'static str,
    pub table: String,
    #[source]
    pub source: EtlError,
}

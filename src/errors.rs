//! Error types for LP-hedge backtesting operations

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Result type alias for consistent error handling throughout the crate
pub type Result<T> = std::result::Result<T, LpHedgeError>;

/// Main error type for LP-hedge backtesting operations
#[derive(Debug, Error)]
pub enum LpHedgeError {
    /// Invalid caller-supplied input; fatal, raised before any state mutation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No price or funding match could be joined for a trading day (non-fatal)
    #[error("Missing join data for day: {0}")]
    MissingJoinData(DateTime<FixedOffset>),

    /// Error reported by an external collaborator (exchange API, pool data source)
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Network or HTTP related errors
    #[error("Network error: {0}")]
    Network(String),

    /// Error during data conversion between formats
    #[error("Data conversion error: {0}")]
    DataConversion(String),

    /// Invalid time range specified
    #[error("Invalid time range: start {start} >= end {end}")]
    InvalidTimeRange { start: u64, end: u64 },

    /// General backtesting error
    #[error("Backtesting error: {0}")]
    Backtesting(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    /// CSV processing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Date/time parsing errors
    #[error("DateTime parsing error: {0}")]
    DateTimeParsing(#[from] chrono::ParseError),

    /// Numeric parsing errors
    #[error("Number parsing error: {0}")]
    NumberParsing(String),
}

// Error conversion implementations for external library errors

impl From<std::num::ParseFloatError> for LpHedgeError {
    fn from(err: std::num::ParseFloatError) -> Self {
        LpHedgeError::NumberParsing(err.to_string())
    }
}

impl From<std::num::ParseIntError> for LpHedgeError {
    fn from(err: std::num::ParseIntError) -> Self {
        LpHedgeError::NumberParsing(err.to_string())
    }
}

// Helper methods for error creation
impl LpHedgeError {
    /// Create a new InvalidInput error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new MissingJoinData error
    pub fn missing_join_data(timestamp: DateTime<FixedOffset>) -> Self {
        Self::MissingJoinData(timestamp)
    }

    /// Create a new Collaborator error
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a new Network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new DataConversion error
    pub fn data_conversion(msg: impl Into<String>) -> Self {
        Self::DataConversion(msg.into())
    }

    /// Create a new InvalidTimeRange error
    pub fn invalid_time_range(start: u64, end: u64) -> Self {
        Self::InvalidTimeRange { start, end }
    }

    /// Create a new Validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Check if this error is recoverable (caller can retry the collaborator call)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Collaborator(_))
    }

    /// Check if this error is due to caller input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidTimeRange { .. } | Self::Validation(_)
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "validation",
            Self::MissingJoinData(_) => "data",
            Self::Collaborator(_) => "api",
            Self::Network(_) => "network",
            Self::DataConversion(_) => "data",
            Self::InvalidTimeRange { .. } => "validation",
            Self::Backtesting(_) => "computation",
            Self::Validation(_) => "validation",
            Self::JsonParsing(_) => "parsing",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
            Self::DateTimeParsing(_) => "parsing",
            Self::NumberParsing(_) => "parsing",
        }
    }
}

// Conversion for tokio join errors
impl From<tokio::task::JoinError> for LpHedgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        LpHedgeError::Backtesting(format!("Task join error: {}", err))
    }
}

// Conversion for hyperliquid_rust_sdk errors
impl From<hyperliquid_rust_sdk::Error> for LpHedgeError {
    fn from(err: hyperliquid_rust_sdk::Error) -> Self {
        match err {
            hyperliquid_rust_sdk::Error::ClientRequest {
                status_code,
                error_code,
                error_message,
                error_data,
            } => LpHedgeError::Collaborator(format!(
                "Client error: status {}, code {:?}, message: {}, data: {:?}",
                status_code, error_code, error_message, error_data
            )),
            hyperliquid_rust_sdk::Error::ServerRequest {
                status_code,
                error_message,
            } => LpHedgeError::Collaborator(format!(
                "Server error: status {}, message: {}",
                status_code, error_message
            )),
            hyperliquid_rust_sdk::Error::GenericRequest(msg) => LpHedgeError::Network(msg),
            hyperliquid_rust_sdk::Error::Websocket(msg) => {
                LpHedgeError::Network(format!("WebSocket error: {}", msg))
            }
            _ => LpHedgeError::Collaborator(format!("Exchange SDK error: {:?}", err)),
        }
    }
}

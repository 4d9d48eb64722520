use intent_parser::CommandType;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = FlightError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("cannot execute {command}: {reason}")]
    Precondition {
        command: CommandType,
        reason: String,
    },
    #[error("{operation} timed out after {budget:?}")]
    Timeout {
        operation: &'static str,
        budget: Duration,
    },
    #[error("action rejected: {0}")]
    ActionRejected(String),
    #[error("offboard rejected: {0}")]
    OffboardRejected(String),
    #[error("telemetry unavailable: {0}")]
    TelemetryUnavailable(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("vehicle not connected")]
    NotConnected,
    #[error("{0}")]
    Unclassified(String),
}

impl FlightError {
    pub fn precondition(command: CommandType, reason: impl Into<String>) -> Self {
        FlightError::Precondition {
            command,
            reason: reason.into(),
        }
    }

    /// Only a failed connection at startup ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlightError::Connection(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FlightError::Timeout { .. })
    }
}

impl From<std::io::Error> for FlightError {
    fn from(e: std::io::Error) -> Self {
        FlightError::Unclassified(e.to_string())
    }
}

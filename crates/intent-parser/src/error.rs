use thiserror::Error;

pub type Result<T, E = ParseError> = core::result::Result<T, E>;

/// Failure while interpreting a single fragment. Never escapes
/// [`UtteranceParser::parse`](crate::UtteranceParser::parse): the fragment is
/// logged and dropped instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("magnitude out of range: {0}")]
    MagnitudeOverflow(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

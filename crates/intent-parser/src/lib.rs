//! Intent Parser for Voice Flight Commands
//!
//! This crate turns transcribed speech into an ordered list of typed flight
//! commands. The vocabulary is fixed: trigger phrases, number words and unit
//! keywords live in [`lexicon`]. Matching is deterministic and order
//! sensitive rather than statistical.

mod error;
pub use error::{ParseError, Result};

pub mod lexicon;
pub use lexicon::CommandType;

mod parser;
pub use parser::{ParsedCommand, UtteranceParser};

mod units;
pub use units::{ConversionCache, Unit, DEFAULT_CACHE_CAPACITY};

/// Initialize the intent parser system
pub fn init() -> Result<()> {
    tracing::info!(
        triggers = lexicon::TRIGGERS.len(),
        "Initializing Intent Parser system"
    );
    Ok(())
}

/// Create a parser with the built-in vocabulary
pub fn create_parser() -> Result<UtteranceParser> {
    UtteranceParser::new()
}

/// Parse a transcribed utterance into commands
pub fn parse_command(text: &str) -> Result<Vec<ParsedCommand>> {
    let parser = create_parser()?;
    Ok(parser.parse(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_commands() {
        let test_cases = vec![
            ("arm", CommandType::Arm),
            ("take off", CommandType::Takeoff),
            ("forward 10 feet", CommandType::Forward),
            ("go up five", CommandType::Up),
            ("turn right ninety degrees", CommandType::RotateRight),
            ("stop", CommandType::Stop),
            ("come home", CommandType::Return),
            ("land", CommandType::Land),
            ("disarm", CommandType::Disarm),
            ("power off", CommandType::Shutdown),
        ];

        for (text, expected) in test_cases {
            let parsed = parse_command(text).unwrap();
            assert_eq!(parsed.len(), 1, "'{}'", text);
            assert_eq!(parsed[0].command, expected, "'{}'", text);
        }
    }
}

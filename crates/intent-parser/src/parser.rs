//! Utterance parser for chained flight commands

use crate::lexicon::{self, CommandType, HUNDRED};
use crate::{ParseError, Result, Unit};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One command extracted from an utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub command: CommandType,
    /// Spoken magnitude, never zero
    pub magnitude: Option<f64>,
    pub unit: Option<Unit>,
}

impl ParsedCommand {
    pub fn new(command: CommandType, magnitude: Option<f64>, unit: Option<Unit>) -> Self {
        Self {
            command,
            magnitude,
            unit,
        }
    }

    pub fn bare(command: CommandType) -> Self {
        Self::new(command, None, None)
    }
}

impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(magnitude) = self.magnitude {
            write!(f, " {}", magnitude)?;
        }
        if let Some(unit) = self.unit {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}

/// Splits utterances into fragments and matches each against the lexicon
pub struct UtteranceParser {
    separator: Regex,
    digits: Regex,
    units: Vec<(Regex, Unit)>,
}

impl UtteranceParser {
    pub fn new() -> Result<Self> {
        let units = lexicon::UNIT_KEYWORDS
            .iter()
            .map(|(pattern, unit)| Ok((Regex::new(pattern)?, *unit)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            separator: Regex::new(lexicon::SEPARATOR_PATTERN)?,
            digits: Regex::new(lexicon::DIGIT_PATTERN)?,
            units,
        })
    }

    /// Parse an utterance into its ordered commands.
    ///
    /// Unrecognized fragments are dropped and a fragment that fails to parse
    /// is logged and dropped, so the result is empty rather than an error
    /// when nothing usable was said.
    pub fn parse(&self, utterance: &str) -> Vec<ParsedCommand> {
        let lowered = utterance.to_lowercase();

        self.separator
            .split(&lowered)
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .filter_map(|fragment| match self.parse_fragment(fragment) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!(fragment, error = %e, "Dropping unparsable fragment");
                    None
                }
            })
            .collect()
    }

    /// Parse a single lower-case fragment. `Ok(None)` means no trigger matched.
    pub fn parse_fragment(&self, fragment: &str) -> Result<Option<ParsedCommand>> {
        let Some((trigger, command)) = lexicon::match_trigger(fragment) else {
            return Ok(None);
        };

        let remainder = fragment.replacen(trigger, "", 1);
        let remainder = remainder.trim();

        let magnitude = self.extract_magnitude(remainder)?;
        let unit = match (self.extract_unit(remainder), magnitude) {
            (Some(unit), _) => Some(unit),
            (None, Some(_)) => Some(Unit::Meters),
            (None, None) => None,
        };

        Ok(Some(ParsedCommand {
            command,
            magnitude,
            unit,
        }))
    }

    /// Digits win over number words. Zero counts as no magnitude.
    fn extract_magnitude(&self, remainder: &str) -> Result<Option<f64>> {
        let total = match self.digits.find(remainder) {
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .map_err(|_| ParseError::MagnitudeOverflow(m.as_str().to_string()))?,
            None => sum_number_words(remainder)?,
        };

        Ok((total > 0).then_some(total as f64))
    }

    fn extract_unit(&self, remainder: &str) -> Option<Unit> {
        self.units
            .iter()
            .find(|(pattern, _)| pattern.is_match(remainder))
            .map(|(_, unit)| *unit)
    }
}

/// Left-to-right running total of number words. "hundred" multiplies what
/// has been accumulated so far; the first unknown word after a non-zero total
/// ends the scan.
fn sum_number_words(text: &str) -> Result<u32> {
    let overflow = || ParseError::MagnitudeOverflow(text.to_string());
    let mut total: u32 = 0;

    for word in text.split_whitespace() {
        match lexicon::number_word(word) {
            Some(HUNDRED) => total = total.checked_mul(HUNDRED).ok_or_else(overflow)?,
            Some(value) => total = total.checked_add(value).ok_or_else(overflow)?,
            None if total > 0 => break,
            None => {}
        }
    }

    Ok(total)
}

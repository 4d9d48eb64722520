//! Static vocabulary: trigger phrases, number words and unit keywords.
//!
//! Trigger matching is substring based and first-match-wins, so the order of
//! [`TRIGGERS`] is part of the grammar. Phrases that contain another trigger
//! ("shutdown" contains "down", "disarm" contains "arm", "rotate left"
//! contains "left") must be declared before the shorter trigger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every command the vocabulary can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Stop,
    Return,
    Land,
    Forward,
    Backward,
    Up,
    Down,
    Left,
    Right,
    RotateLeft,
    RotateRight,
    Takeoff,
    Disarm,
    Arm,
    Shutdown,
}

impl CommandType {
    pub const ALL: [CommandType; 15] = [
        CommandType::Stop,
        CommandType::Return,
        CommandType::Land,
        CommandType::Forward,
        CommandType::Backward,
        CommandType::Up,
        CommandType::Down,
        CommandType::Left,
        CommandType::Right,
        CommandType::RotateLeft,
        CommandType::RotateRight,
        CommandType::Takeoff,
        CommandType::Disarm,
        CommandType::Arm,
        CommandType::Shutdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Stop => "STOP",
            CommandType::Return => "RETURN",
            CommandType::Land => "LAND",
            CommandType::Forward => "FORWARD",
            CommandType::Backward => "BACKWARD",
            CommandType::Up => "UP",
            CommandType::Down => "DOWN",
            CommandType::Left => "LEFT",
            CommandType::Right => "RIGHT",
            CommandType::RotateLeft => "ROTATE_LEFT",
            CommandType::RotateRight => "ROTATE_RIGHT",
            CommandType::Takeoff => "TAKEOFF",
            CommandType::Disarm => "DISARM",
            CommandType::Arm => "ARM",
            CommandType::Shutdown => "SHUTDOWN",
        }
    }

    /// Body-relative translation (forward/backward/up/down/left/right).
    pub fn is_translation(&self) -> bool {
        matches!(
            self,
            CommandType::Forward
                | CommandType::Backward
                | CommandType::Up
                | CommandType::Down
                | CommandType::Left
                | CommandType::Right
        )
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self, CommandType::RotateLeft | CommandType::RotateRight)
    }

    /// Commands that hand control back to the autopilot and therefore
    /// require offboard mode to be stopped first.
    pub fn releases_offboard(&self) -> bool {
        matches!(
            self,
            CommandType::Stop
                | CommandType::Return
                | CommandType::Land
                | CommandType::Disarm
                | CommandType::Shutdown
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger phrases in match order. STOP comes first so it wins over any
/// other command heard in the same fragment.
pub const TRIGGERS: &[(&str, CommandType)] = &[
    ("stop drone", CommandType::Stop),
    ("stop", CommandType::Stop),
    ("shutdown", CommandType::Shutdown),
    ("shut down", CommandType::Shutdown),
    ("power off", CommandType::Shutdown),
    ("disarm drone", CommandType::Disarm),
    ("disarm", CommandType::Disarm),
    ("arm drone", CommandType::Arm),
    ("arm", CommandType::Arm),
    ("rotate left", CommandType::RotateLeft),
    ("turn left", CommandType::RotateLeft),
    ("rotate right", CommandType::RotateRight),
    ("turn right", CommandType::RotateRight),
    ("takeoff", CommandType::Takeoff),
    ("take off", CommandType::Takeoff),
    ("come home", CommandType::Return),
    ("return", CommandType::Return),
    ("home", CommandType::Return),
    ("land drone", CommandType::Land),
    ("land", CommandType::Land),
    ("forward", CommandType::Forward),
    ("backward", CommandType::Backward),
    ("up", CommandType::Up),
    ("down", CommandType::Down),
    ("left", CommandType::Left),
    ("right", CommandType::Right),
];

/// Spoken number words. "to" and "for" are the recognizer's usual spellings
/// of "two" and "four".
pub const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("to", 2),
    ("three", 3),
    ("four", 4),
    ("for", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
    ("hundred", 100),
];

pub const HUNDRED: u32 = 100;

/// Whole-word alternations for unit keywords, in match order.
pub const UNIT_KEYWORDS: &[(&str, crate::Unit)] = &[
    (r"\b(?:inch|inches)\b", crate::Unit::Inches),
    (r"\b(?:feet|foot)\b", crate::Unit::Feet),
    (r"\b(?:yard|yards)\b", crate::Unit::Yards),
    (r"\b(?:degree|degrees)\b", crate::Unit::Degrees),
];

/// Comma and connective words that separate chained commands.
pub const SEPARATOR_PATTERN: &str = r",\s*(?:then\s+|and\s+|next\s+)?|,?\s+(?:then|and|next|after\s+that|followed\s+by|afterward)\s+";

pub const DIGIT_PATTERN: &str = r"\d+";

/// Look up the first trigger contained in `fragment`.
pub fn match_trigger(fragment: &str) -> Option<(&'static str, CommandType)> {
    TRIGGERS
        .iter()
        .find(|(trigger, _)| fragment.contains(trigger))
        .copied()
}

pub fn number_word(word: &str) -> Option<u32> {
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_trigger() {
        for cmd in CommandType::ALL {
            assert!(
                TRIGGERS.iter().any(|(_, c)| *c == cmd),
                "{} has no trigger phrase",
                cmd
            );
        }
    }

    #[test]
    fn longer_trigger_declared_before_contained_trigger() {
        // A trigger that contains another must be checked first or it can
        // never win.
        for (i, (outer, _)) in TRIGGERS.iter().enumerate() {
            for (j, (inner, _)) in TRIGGERS.iter().enumerate() {
                if i != j && outer.contains(inner) {
                    assert!(i < j, "'{}' must precede '{}'", outer, inner);
                }
            }
        }
    }

    #[test]
    fn overlapping_pairs_resolve_to_expected_command() {
        let cases = [
            ("shutdown", CommandType::Shutdown),
            ("shut down", CommandType::Shutdown),
            ("power off", CommandType::Shutdown),
            ("disarm", CommandType::Disarm),
            ("disarm drone", CommandType::Disarm),
            ("arm drone", CommandType::Arm),
            ("rotate left", CommandType::RotateLeft),
            ("turn left", CommandType::RotateLeft),
            ("rotate right", CommandType::RotateRight),
            ("turn right", CommandType::RotateRight),
            ("stop drone", CommandType::Stop),
            ("come home", CommandType::Return),
            ("land drone", CommandType::Land),
            ("take off", CommandType::Takeoff),
        ];
        for (phrase, expected) in cases {
            let (_, got) = match_trigger(phrase).unwrap();
            assert_eq!(got, expected, "phrase '{}'", phrase);
        }
        assert_eq!(match_trigger("land drone").unwrap().0, "land drone");
        assert_eq!(match_trigger("stop drone").unwrap().0, "stop drone");
    }

    #[test]
    fn stop_wins_over_other_commands_in_fragment() {
        for phrase in [
            "stop takeoff",
            "stop the arm",
            "stop turn left",
            "stop rotate right",
            "stop going down",
            "shut down stop",
        ] {
            assert_eq!(
                match_trigger(phrase).map(|(_, c)| c),
                Some(CommandType::Stop),
                "phrase '{}'",
                phrase
            );
        }
    }

    #[test]
    fn display_uses_screaming_case() {
        assert_eq!(CommandType::RotateLeft.to_string(), "ROTATE_LEFT");
        assert_eq!(
            serde_json::to_string(&CommandType::RotateRight).unwrap(),
            "\"ROTATE_RIGHT\""
        );
    }

    #[test]
    fn homophones_map_to_numbers() {
        assert_eq!(number_word("to"), Some(2));
        assert_eq!(number_word("for"), Some(4));
        assert_eq!(number_word("drone"), None);
    }
}

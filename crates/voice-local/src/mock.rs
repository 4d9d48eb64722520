use crate::{Transcript, TranscriptSource};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptStep {
    Say(String),
    Silence(u32),
}

/// Replays a fixed script of utterances, one per poll, with optional silent
/// polls in between.
#[derive(Debug, Default)]
pub struct ScriptedTranscript {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each non-empty line is an utterance; an empty line is one silent poll.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut script = Self::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                script = script.silence(1);
            } else {
                script = script.say(line);
            }
        }
        script
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Say(text.into()));
        self
    }

    /// Insert `polls` polls that return nothing.
    pub fn silence(mut self, polls: u32) -> Self {
        if polls > 0 {
            self.steps.push_back(ScriptStep::Silence(polls));
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, ScriptStep::Say(_)))
            .count()
    }
}

impl TranscriptSource for ScriptedTranscript {
    fn poll(&mut self) -> Option<Transcript> {
        match self.steps.pop_front()? {
            ScriptStep::Say(text) => Some(Transcript::now(text)),
            ScriptStep::Silence(polls) => {
                if polls > 1 {
                    self.steps.push_front(ScriptStep::Silence(polls - 1));
                }
                None
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One recognized utterance handed over by a transcription source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub ts: Option<OffsetDateTime>,
}

impl Transcript {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ts: Some(OffsetDateTime::now_utc()),
        }
    }
}

#[cfg(feature = "mock")]
use crate::ScriptedTranscript;
use crate::{StdinTranscript, TranscriptSource};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptBackendKind {
    /// Replay a fixed list of utterances
    Script,
    /// One utterance per line on standard input
    Stdin,
}

pub fn new_transcript_source(
    kind: TranscriptBackendKind,
    script: &[String],
) -> Result<Box<dyn TranscriptSource>, String> {
    match kind {
        TranscriptBackendKind::Script => {
            #[cfg(feature = "mock")]
            {
                Ok(Box::new(ScriptedTranscript::from_lines(script)))
            }
            #[cfg(not(feature = "mock"))]
            {
                let _ = script;
                Err("mock feature not enabled".into())
            }
        }
        TranscriptBackendKind::Stdin => StdinTranscript::spawn()
            .map(|s| Box::new(s) as Box<dyn TranscriptSource>)
            .map_err(|e| e.to_string()),
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;

    #[test]
    fn script_backend_replays_lines() {
        let script = vec!["arm".to_string(), String::new(), "take off".to_string()];
        let mut source = new_transcript_source(TranscriptBackendKind::Script, &script).unwrap();
        assert_eq!(source.poll().map(|t| t.text), Some("arm".to_string()));
        assert!(source.poll().is_none());
        assert_eq!(source.poll().map(|t| t.text), Some("take off".to_string()));
        assert!(source.is_exhausted());
    }

    #[test]
    fn backend_kind_names() {
        let kind: TranscriptBackendKind = serde_json::from_str("\"stdin\"").unwrap();
        assert_eq!(kind, TranscriptBackendKind::Stdin);
    }
}

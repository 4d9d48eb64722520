//! voice-local: transcription sources for the voice command loop
//!
//! Speech-to-text itself happens elsewhere; this crate only defines how
//! recognized text reaches the command loop, plus a scripted mock and a stdin
//! backend.

mod types;
pub use types::Transcript;

mod traits;
pub use traits::TranscriptSource;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::ScriptedTranscript;

mod stdin;
pub use stdin::StdinTranscript;

pub mod plugin;

use crate::{Transcript, TranscriptSource};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Reads one utterance per line from standard input.
///
/// A background thread owns the blocking reads and forwards lines over a
/// channel, so `poll` never blocks the command loop.
pub struct StdinTranscript {
    rx: Receiver<String>,
    closed: bool,
}

impl StdinTranscript {
    pub fn spawn() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::Builder::new()
            .name("stdin-transcript".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!("stdin read error: {}", e);
                            break;
                        }
                    }
                }
            })?;

        Ok(Self { rx, closed: false })
    }
}

impl TranscriptSource for StdinTranscript {
    fn poll(&mut self) -> Option<Transcript> {
        if self.closed {
            return None;
        }
        loop {
            match self.rx.try_recv() {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        return Some(Transcript::now(line));
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.closed
    }
}

use crate::Transcript;

/// Something that yields recognized speech, polled by the command loop at
/// its own rate.
pub trait TranscriptSource: Send {
    /// Next utterance, or `None` when nothing new was recognized since the
    /// previous poll. Must not block.
    fn poll(&mut self) -> Option<Transcript>;

    /// True once the source can never produce another utterance.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<T: TranscriptSource + ?Sized> TranscriptSource for Box<T> {
    fn poll(&mut self) -> Option<Transcript> {
        (**self).poll()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

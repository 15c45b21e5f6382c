//! Thread parking for the tick handoff.
use std::sync::{Condvar, Mutex};

/// A wait/notify gate with counting-token semantics.
///
/// Unlike [`std::thread::park`], **tokens accumulate**: each call to
/// [`unpark`](Self::unpark) banks one token and each [`park`](Self::park)
/// consumes exactly one. A tick granted before the target thread reaches its
/// `park` is therefore never lost, which is what lets the scheduler release a
/// task and grant it within the same tick.
#[derive(Debug, Default)]
pub struct Parker {
    tokens: Mutex<usize>,
    condvar: Condvar,
}

impl Parker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until a token is available, then consume it.
    pub fn park(&self) {
        // A panicking worker must not wedge teardown, so poisoning is
        // ignored; the counter cannot be left half-updated.
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        while *tokens == 0 {
            tokens = self
                .condvar
                .wait(tokens)
                .unwrap_or_else(|e| e.into_inner());
        }
        *tokens -= 1;
    }

    /// Bank one token, waking a parked thread if there is one.
    pub fn unpark(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        *tokens += 1;
        self.condvar.notify_one();
    }
}

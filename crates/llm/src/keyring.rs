//! Round-robin rotation over the configured upstream API keys.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::LlmError;

/// Process-wide key rotation cursor.
///
/// Every outbound upstream call takes the next key via an atomic
/// increment-and-wrap. Exact fairness under concurrency is best-effort,
/// not a correctness requirement; the cursor resets on restart.
pub struct KeyRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next key in rotation. Fails if no keys are configured.
    pub fn next(&self) -> Result<&str, LlmError> {
        if self.keys.is_empty() {
            return Err(LlmError::NoApiKeys);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Ok(&self.keys[index])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

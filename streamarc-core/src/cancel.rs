//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cheap shared flag. The reader checks it before each
//! payload read, between skip chunks and before decoding each header; once
//! it fires the session is closed and no further bytes are trusted.

use crate::error::{Result, StreamArcError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag.
///
/// Cloning a token yields a handle to the same flag, so a token handed to
/// another thread can stop a traversal running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return [`StreamArcError::Cancelled`] if the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StreamArcError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//! Cancellation and deadline for one query.
//!
//! Checked at the top of every backward-walk step. Stopping early leaves the
//! shared graph valid: nodes already expanded stay expanded, the rest are
//! picked up by the next query that reaches them.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{BlameError, Result};

#[derive(Debug, Clone, Default)]
pub struct QueryControl {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl QueryControl {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// No cancellation, no deadline.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(CancellationToken::new(), Some(timeout))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(BlameError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BlameError::TimedOut);
        }
        Ok(())
    }
}

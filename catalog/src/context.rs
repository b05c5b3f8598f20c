//! Cooperative cancellation for a single call.
//!
//! Long-running store operations (search, upload) check the call's `Context`
//! at every step and stop as soon as it has been canceled or its deadline has
//! passed. Work already done is not rolled back.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("request is canceled")]
    Canceled,
    #[error("deadline is exceeded")]
    DeadlineExceeded,
}

/// Lifecycle of one call. Clones share the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// A context that is never canceled and has no deadline
    pub fn background() -> Context {
        Context::default()
    }

    pub fn with_deadline(deadline: Instant) -> Context {
        Context {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Context {
        Context::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token that fires when this context is canceled. Async work can wait
    /// on `cancelled()`.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the reason this context is done, if it is. Cancellation wins
    /// over an expired deadline.
    pub fn err(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn background_is_never_done() {
        let ctx = Context::background();
        assert_eq!(ctx.err(), Ok(()));
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        let other = ctx.clone();
        other.cancel();
        assert_eq!(ctx.err(), Err(ContextError::Canceled));
    }

    #[test]
    fn past_deadline_is_exceeded() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.err(), Err(ContextError::DeadlineExceeded));
    }

    #[test]
    fn cancel_fires_the_shared_token() {
        let ctx = Context::background();
        let token = ctx.token().clone();
        assert!(!token.is_cancelled());
        ctx.cancel();
        assert!(token.is_cancelled());
    }
}

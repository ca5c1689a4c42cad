use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{LedgerError, Result};

/// cancellation and deadline signal threaded through every storage call
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// never cancelled, no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// handle that cancels this context and every clone of it
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// fail once cancellation or the deadline has been observed
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(LedgerError::DeadlineExceeded);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fails() {
        assert!(Context::background().check().is_ok());
    }

    #[test]
    fn test_cancel_reaches_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        ctx.cancel_handle().cancel();
        assert!(matches!(clone.check(), Err(LedgerError::Cancelled)));
    }

    #[test]
    fn test_elapsed_deadline() {
        let ctx = Context::with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(LedgerError::DeadlineExceeded)));

        let ctx = Context::with_timeout(Duration::from_secs(60));
        assert!(ctx.check().is_ok());
    }
}

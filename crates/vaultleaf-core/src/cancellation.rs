use crate::error::{Result, VaultError};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag flipped by `stop()` calls and observed by queued speech work.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(VaultError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancellation() {
        let token = CancellationToken::new();
        let queued = token.clone();
        assert!(queued.check_cancelled().is_ok());
        token.cancel();
        assert!(queued.is_cancelled());
        assert!(matches!(queued.check_cancelled(), Err(VaultError::Cancelled)));
    }
}

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{FlowError, Result};

/// Single slot for wallet write prompts (approve, purchase).
///
/// Only one write may be outstanding per session; a second attempt fails fast
/// with [`FlowError::WriteInFlight`] instead of queueing behind the first.
#[derive(Debug, Clone, Default)]
pub struct WriteSlot {
    inner: Arc<Mutex<()>>,
}

/// Held while a write is being submitted or confirmed.
#[derive(Debug)]
pub struct WriteGuard {
    _guard: OwnedMutexGuard<()>,
}

impl WriteSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<WriteGuard> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map(|guard| WriteGuard { _guard: guard })
            .map_err(|_| FlowError::WriteInFlight)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let slot = WriteSlot::new();
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(slot.try_acquire(), Err(FlowError::WriteInFlight)));

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_ok());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = WriteSlot::new();
        let other = slot.clone();
        let _guard = slot.try_acquire().unwrap();
        assert!(other.try_acquire().is_err());
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-case async locks.
///
/// Every mutation of a case runs while holding that case's guard, so votes
/// and resolution on one case are applied one at a time while different
/// cases proceed independently.
#[derive(Clone, Default)]
pub struct CaseLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl CaseLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `case_id`.
    pub async fn lock(&self, case_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody holds or waits on.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(case_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of cases with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no case has a live lock entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

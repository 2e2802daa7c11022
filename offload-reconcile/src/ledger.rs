//! Per-function in-flight invocation counts.
//!
//! One coordinator owns the map; callers go through [`InFlightLedger::begin`]
//! or the compare-and-update accessor instead of sharing a global counter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use offload_core::FunctionName;

#[derive(Debug, Default)]
pub struct InFlightLedger {
    counts: Mutex<HashMap<FunctionName, usize>>,
}

/// Decrements its function's count when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    ledger: &'a InFlightLedger,
    name: FunctionName,
}

impl InFlightLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more invocation of `name` until the guard drops.
    pub fn begin(&self, name: &FunctionName) -> InFlightGuard<'_> {
        *self.lock().entry(name.clone()).or_insert(0) += 1;
        InFlightGuard {
            ledger: self,
            name: name.clone(),
        }
    }

    pub fn count(&self, name: &FunctionName) -> usize {
        self.lock().get(name).copied().unwrap_or(0)
    }

    /// Set `name`'s count to `new` only if it currently equals `expected`.
    /// On mismatch returns the actual count, like `AtomicUsize::compare_exchange`.
    pub fn compare_and_update(
        &self,
        name: &FunctionName,
        expected: usize,
        new: usize,
    ) -> Result<usize, usize> {
        let mut counts = self.lock();
        let current = counts.get(name).copied().unwrap_or(0);
        if current != expected {
            return Err(current);
        }
        if new == 0 {
            counts.remove(name);
        } else {
            counts.insert(name.clone(), new);
        }
        Ok(current)
    }

    /// Functions with at least one invocation in flight.
    pub fn active(&self) -> Vec<FunctionName> {
        let mut names: Vec<_> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FunctionName, usize>> {
        self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut counts = self.ledger.lock();
        if let Some(count) = counts.get_mut(&self.name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.name);
            }
        }
    }
}

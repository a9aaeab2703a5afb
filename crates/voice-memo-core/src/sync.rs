use std::sync::{Mutex, MutexGuard};

use tracing::error;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// State guarded by these mutexes is always written whole, so a poisoned
/// lock still holds a consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| {
        error!("Lock poisoned, recovering: {}", e);
        e.into_inner()
    })
}

//! Lease lock over the option store
//!
//! The lock value is the acquiring process's unix timestamp. A value older
//! than the TTL is stale and may be taken over, so a crashed holder blocks
//! others for at most one TTL. Acquisition never waits.

use std::time::Duration;

use crate::errors::Result;
use crate::options::OptionStore;

/// Held lock; the key is deleted on [`MigrationLock::release`] or drop
#[derive(Debug)]
pub struct MigrationLock<'s, S: OptionStore + ?Sized> {
    store: &'s S,
    key: String,
    acquired_at: i64,
    released: bool,
}

impl<'s, S: OptionStore + ?Sized> MigrationLock<'s, S> {
    /// Try to take `key` now.
    ///
    /// # Errors
    ///
    /// Store failure; contention is `Ok(None)`.
    pub fn try_acquire(store: &'s S, key: &str, ttl: Duration) -> Result<Option<Self>> {
        Self::try_acquire_at(store, key, ttl, chrono::Utc::now().timestamp())
    }

    /// Same as [`MigrationLock::try_acquire`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Store failure; contention is `Ok(None)`.
    pub fn try_acquire_at(store: &'s S, key: &str, ttl: Duration, now: i64) -> Result<Option<Self>> {
        let stamp = now.to_string();
        let current = store.get_option(key)?;

        let swapped = match current.as_deref() {
            None => store.compare_and_swap(key, None, &stamp)?,
            Some(held) => {
                let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
                // unparsable values count as stale
                let fresh = held
                    .trim()
                    .parse::<i64>()
                    .is_ok_and(|since| now.saturating_sub(since) < ttl);
                if fresh {
                    tracing::debug!(key, held, "lock held");
                    return Ok(None);
                }
                tracing::debug!(key, held, "taking over stale lock");
                store.compare_and_swap(key, Some(held), &stamp)?
            }
        };

        if !swapped {
            return Ok(None);
        }

        Ok(Some(Self {
            store,
            key: key.to_string(),
            acquired_at: now,
            released: false,
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn acquired_at(&self) -> i64 {
        self.acquired_at
    }

    /// # Errors
    ///
    /// Store failure while deleting the key.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.store.delete_option(&self.key).map(|_| ())
    }
}

impl<S: OptionStore + ?Sized> Drop for MigrationLock<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.store.delete_option(&self.key) {
            tracing::warn!(key = %self.key, error = %err, "failed to release lock");
        }
    }
}

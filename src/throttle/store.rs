use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::record::{AttemptUpdate, LoginAttemptRecord};
use crate::error::StoreError;

/// Persistence for login attempt records, keyed by email.
///
/// The login throttle is the only caller. Implementations must apply
/// [`AttemptUpdate`]s atomically per email (a single conditional write, a
/// transaction, or per-key serialization) so that two concurrent failures
/// both count.
///
/// A missing record is `Ok(None)`, never an error. Timeouts and aborted
/// calls must surface as [`StoreError`]s.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Reads the record for `email`.
    async fn read(&self, email: &str) -> Result<Option<LoginAttemptRecord>, StoreError>;

    /// Applies `update` to the record for `email` and returns the stored
    /// result, or `None` if the update wrote nothing.
    async fn upsert(
        &self,
        email: &str,
        update: AttemptUpdate,
    ) -> Result<Option<LoginAttemptRecord>, StoreError>;
}

#[async_trait]
impl<S: AttemptStore + ?Sized> AttemptStore for Arc<S> {
    async fn read(&self, email: &str) -> Result<Option<LoginAttemptRecord>, StoreError> {
        (**self).read(email).await
    }

    async fn upsert(
        &self,
        email: &str,
        update: AttemptUpdate,
    ) -> Result<Option<LoginAttemptRecord>, StoreError> {
        (**self).upsert(email, update).await
    }
}

/// An in-process attempt store.
///
/// Updates run under one mutex, which gives the per-key serialization the
/// [`AttemptStore`] contract asks for. Records live as long as the store.
#[derive(Debug, Default)]
pub struct MemoryAttemptStore {
    records: Mutex<HashMap<String, LoginAttemptRecord>>,
}

impl MemoryAttemptStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or overwrites a record.
    pub fn insert(&self, record: LoginAttemptRecord) -> Result<(), StoreError> {
        self.lock()?.insert(record.email.clone(), record);
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Returns true if no email has a record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, LoginAttemptRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::unavailable("attempt store mutex poisoned"))
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn read(&self, email: &str) -> Result<Option<LoginAttemptRecord>, StoreError> {
        Ok(self.lock()?.get(email).cloned())
    }

    async fn upsert(
        &self,
        email: &str,
        update: AttemptUpdate,
    ) -> Result<Option<LoginAttemptRecord>, StoreError> {
        let mut records = self.lock()?;
        let Some(next) = update.apply(email, records.get(email)) else {
            return Ok(None);
        };

        tracing::trace!(
            email = %email,
            attempts = next.attempts_count,
            at = %update.at(),
            "attempt record written"
        );
        records.insert(email.to_string(), next.clone());
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn failure() -> AttemptUpdate {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        AttemptUpdate::Failure {
            at,
            max_attempts: 5,
            lock_until: at + Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn read_missing_is_none() {
        let store = MemoryAttemptStore::new();
        assert_eq!(store.read("nobody@x.com").await, Ok(None));
    }

    #[tokio::test]
    async fn failures_accumulate() {
        let store = MemoryAttemptStore::new();
        for _ in 0..3 {
            store.upsert("a@x.com", failure()).await.unwrap();
        }

        let record = store.read("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn success_without_record_creates_nothing() {
        let store = MemoryAttemptStore::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let written = store
            .upsert("a@x.com", AttemptUpdate::Success { at })
            .await
            .unwrap();

        assert!(written.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn len_survives_poisoned_lock() {
        let store = Arc::new(MemoryAttemptStore::new());
        store.upsert("a@x.com", failure()).await.unwrap();

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("poison the attempt store");
        })
        .join();

        assert!(store.records.is_poisoned());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failures_are_not_lost() {
        let store = Arc::new(MemoryAttemptStore::new());

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.upsert("race@x.com", failure()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let record = store.read("race@x.com").await.unwrap().unwrap();
        assert_eq!(record.attempts_count, 32);
    }
}

//! In-memory `AuthStore` double.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use baileys_authdb_storage::{AuthStore, StorageError};

type Rows = Arc<Mutex<BTreeMap<(String, String), String>>>;

/// Rows are keyed by `(session, identifier)` and shared between clones of
/// the same backing map, so a "reopen" sees earlier writes.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    session: String,
    rows: Rows,
    fail_writes_to: Option<String>,
    closed: AtomicBool,
}

#[allow(clippy::unwrap_used, reason = "test code")]
impl MemoryStore {
    pub(crate) fn new(session: &str) -> Self {
        Self { session: session.to_owned(), ..Self::default() }
    }

    /// Another store over the same rows, possibly for a different session.
    pub(crate) fn reopen(&self, session: &str) -> Self {
        Self { session: session.to_owned(), rows: Arc::clone(&self.rows), ..Self::default() }
    }

    /// Make writes to `identifier` fail.
    pub(crate) fn failing_on(mut self, identifier: &str) -> Self {
        self.fail_writes_to = Some(identifier.to_owned());
        self
    }

    pub(crate) fn raw(&self, identifier: &str) -> Option<String> {
        self.rows.lock().unwrap().get(&(self.session.clone(), identifier.to_owned())).cloned()
    }

    pub(crate) fn insert_raw(&self, identifier: &str, value: &str) {
        self.rows
            .lock()
            .unwrap()
            .insert((self.session.clone(), identifier.to_owned()), value.to_owned());
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
#[allow(clippy::unwrap_used, reason = "test code")]
impl AuthStore for MemoryStore {
    fn session(&self) -> &str {
        &self.session
    }

    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes_to.as_deref() == Some(identifier) {
            return Err(StorageError::InvalidOptions(format!("injected failure for {identifier}")));
        }
        self.insert_raw(identifier, value);
        Ok(())
    }

    async fn get_value(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(identifier))
    }

    async fn remove(&self, identifier: &str) -> Result<(), StorageError> {
        self.rows.lock().unwrap().remove(&(self.session.clone(), identifier.to_owned()));
        Ok(())
    }

    async fn wipe(&self) -> Result<(), StorageError> {
        self.rows.lock().unwrap().retain(|(session, _), _| *session != self.session);
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

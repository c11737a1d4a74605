//! Storage backend trait abstraction
//!
//! Every backend stores text values keyed by `(session, identifier)` and
//! scoped to the session it was opened for. [`AuthStoreExt`] adds the typed
//! `store`/`read` pair on top, running values through the buffer-aware codec.

use async_trait::async_trait;
use baileys_authdb_core::codec;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

/// Session-scoped key/value persistence.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Session namespace this store reads and writes.
    fn session(&self) -> &str;

    /// Insert or replace the value stored under `identifier`.
    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError>;

    /// Stored text for `identifier`, `None` when absent or NULL.
    async fn get_value(&self, identifier: &str) -> Result<Option<String>, StorageError>;

    /// Delete one entry. Missing entries are not an error.
    async fn remove(&self, identifier: &str) -> Result<(), StorageError>;

    /// Delete every entry of this session, other sessions untouched.
    async fn wipe(&self) -> Result<(), StorageError>;

    /// Release pool / client resources. Safe to call twice.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Typed access over any [`AuthStore`].
#[async_trait]
pub trait AuthStoreExt: AuthStore {
    /// Encode `payload` and upsert it under `identifier`.
    async fn store<T>(&self, payload: &T, identifier: &str) -> Result<(), StorageError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let text = codec::serialize(payload).map_err(|source| StorageError::DataCorruption {
            identifier: identifier.to_owned(),
            source,
        })?;
        self.put_value(identifier, &text).await
    }

    /// Fetch and decode the value under `identifier`.
    async fn read<T>(&self, identifier: &str) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned + Send,
    {
        let Some(text) = self.get_value(identifier).await? else {
            return Ok(None);
        };
        codec::deserialize(&text).map(Some).map_err(|source| {
            tracing::warn!(identifier, error = %source, "stored value failed to decode");
            StorageError::DataCorruption { identifier: identifier.to_owned(), source }
        })
    }
}

impl<S: AuthStore + ?Sized> AuthStoreExt for S {}

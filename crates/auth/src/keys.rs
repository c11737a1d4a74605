//! Typed signal key store over an [`AuthStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use baileys_authdb_core::{SignalDataSet, SignalDataType, SignalValue, codec};
use baileys_authdb_storage::{AuthStore, StorageError};
use futures_util::future::{join_all, try_join_all};

use crate::error::AuthError;

/// `get`/`set` access to key-store entries stored as `"<type>_<id>"`.
#[derive(Debug)]
pub struct SignalKeyStore<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for SignalKeyStore<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: AuthStore + ?Sized> SignalKeyStore<S> {
    pub(crate) const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Entries of `kind` for `ids`. Ids with no stored value are left out
    /// of the result.
    pub async fn get<I>(
        &self,
        kind: SignalDataType,
        ids: I,
    ) -> Result<BTreeMap<String, SignalValue>, AuthError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let lookups = ids.into_iter().map(|id| self.lookup(kind, id.into()));
        let found = try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Apply a batch of writes: `Some` upserts, `None` deletes. Every entry
    /// is attempted; the first failure is returned once all have settled.
    pub async fn set(&self, data: SignalDataSet) -> Result<(), AuthError> {
        let writes = data.into_iter().flat_map(|(kind, entries)| {
            entries.into_iter().map(move |(id, value)| self.write(kind, id, value))
        });

        let results = join_all(writes).await;
        let total = results.len();
        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                let failed = 1 + failures.count();
                tracing::warn!(failed, total, error = %first, "key-store batch write failed");
                Err(first)
            },
        }
    }

    async fn lookup(
        &self,
        kind: SignalDataType,
        id: String,
    ) -> Result<Option<(String, SignalValue)>, AuthError> {
        let identifier = kind.identifier(&id);
        let Some(text) = self.store.get_value(&identifier).await? else {
            return Ok(None);
        };
        let value = SignalValue::decode(kind, &text).map_err(|source| {
            tracing::warn!(%identifier, error = %source, "key-store entry failed to decode");
            StorageError::DataCorruption { identifier: identifier.clone(), source }
        })?;
        Ok(Some((id, value)))
    }

    async fn write(
        &self,
        kind: SignalDataType,
        id: String,
        value: Option<SignalValue>,
    ) -> Result<(), AuthError> {
        let identifier = kind.identifier(&id);
        match value {
            None => self.store.remove(&identifier).await?,
            Some(value) => {
                if value.data_type() != kind {
                    return Err(AuthError::KindMismatch {
                        identifier,
                        expected: kind,
                        actual: value.data_type(),
                    });
                }
                let text = codec::serialize(&value)?;
                self.store.put_value(&identifier, &text).await?;
            },
        }
        Ok(())
    }
}

//! Unified storage backend with enum dispatch.

use async_trait::async_trait;

use crate::dialect::{Dialect, resolve};
use crate::error::StorageError;
use crate::options::{ConnectionDescriptor, SessionOptions};
use crate::traits::AuthStore;

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            #[cfg(feature = "mysql")]
            Connection::MySql(s) => s.$method($($arg),*).await,
            #[cfg(feature = "postgres")]
            Connection::Postgres(s) => s.$method($($arg),*).await,
            #[cfg(feature = "mongodb")]
            Connection::MongoDb(s) => s.$method($($arg),*).await,
        }
    };
}

/// An open store for one session on whichever backend the descriptor named.
#[derive(Clone, Debug)]
pub enum Connection {
    #[cfg(feature = "mysql")]
    MySql(crate::mysql::MySqlStore),
    #[cfg(feature = "postgres")]
    Postgres(crate::postgres::PgStore),
    #[cfg(feature = "mongodb")]
    MongoDb(crate::mongo::MongoStore),
}

impl Connection {
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        match *self {
            #[cfg(feature = "mysql")]
            Self::MySql(_) => Dialect::MySql,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "mongodb")]
            Self::MongoDb(_) => Dialect::MongoDb,
        }
    }
}

/// Resolve the backend for `descriptor` and initialise it.
pub async fn connect(
    descriptor: &ConnectionDescriptor,
    overrides: &SessionOptions,
) -> Result<Connection, StorageError> {
    let dialect = resolve(descriptor)?;
    tracing::debug!(%dialect, "opening connection");
    match dialect {
        #[cfg(feature = "mysql")]
        Dialect::MySql => {
            Ok(Connection::MySql(crate::mysql::MySqlStore::init(descriptor, overrides).await?))
        },
        #[cfg(feature = "postgres")]
        Dialect::Postgres => {
            Ok(Connection::Postgres(crate::postgres::PgStore::init(descriptor, overrides).await?))
        },
        #[cfg(feature = "mongodb")]
        Dialect::MongoDb => {
            Ok(Connection::MongoDb(crate::mongo::MongoStore::init(descriptor, overrides).await?))
        },
        #[allow(unreachable_patterns, reason = "reachable only when a backend feature is off")]
        disabled => {
            let _ = overrides;
            Err(StorageError::UnsupportedDialect(format!("{disabled} (backend not compiled in)")))
        },
    }
}

#[async_trait]
impl AuthStore for Connection {
    fn session(&self) -> &str {
        match self {
            #[cfg(feature = "mysql")]
            Self::MySql(s) => s.session(),
            #[cfg(feature = "postgres")]
            Self::Postgres(s) => s.session(),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(s) => s.session(),
        }
    }

    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError> {
        dispatch!(self, put_value(identifier, value))
    }

    async fn get_value(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        dispatch!(self, get_value(identifier))
    }

    async fn remove(&self, identifier: &str) -> Result<(), StorageError> {
        dispatch!(self, remove(identifier))
    }

    async fn wipe(&self) -> Result<(), StorageError> {
        dispatch!(self, wipe())
    }

    async fn close(&self) -> Result<(), StorageError> {
        dispatch!(self, close())
    }
}

//! Typed error enum for the storage layer.
//!
//! Every backend reports through [`StorageError`], so callers can tell a bad
//! connection descriptor apart from a dead server or a corrupt row without
//! downcasting driver errors.

use baileys_authdb_core::CodecError;
use thiserror::Error;

use crate::dialect::Dialect;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Text does not match `scheme://[user[:password]@]host[:port][/path][?query]`.
    #[error(
        "invalid connection string: expected scheme://[user[:password]@]host[:port][/path][?query]"
    )]
    InvalidConnectionString,

    /// Scheme (or `dialect` field) names no known backend.
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// Structured options or session options rejected before connecting.
    #[error("invalid connection options: {0}")]
    InvalidOptions(String),

    /// Pool / client creation, connectivity check or schema setup failed.
    #[error("{dialect} connection failed: {source}")]
    Connection {
        dialect: Dialect,
        #[source]
        source: DriverError,
    },

    /// A read, write or delete failed at the driver.
    #[error("{op} failed: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: DriverError,
    },

    /// A stored value could not be decoded.
    #[error("stored value for `{identifier}` is corrupt: {source}")]
    DataCorruption {
        identifier: String,
        #[source]
        source: CodecError,
    },
}

/// Error surfaced by one of the database drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[cfg(feature = "mongodb")]
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl DriverError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Sql(err) => matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)),
            #[cfg(feature = "mongodb")]
            Self::Mongo(err) => matches!(
                *err.kind,
                mongodb::error::ErrorKind::Io(_) | mongodb::error::ErrorKind::ServerSelection { .. }
            ),
        }
    }
}

impl StorageError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { source, .. } | Self::Operation { source, .. } => {
                source.is_transient()
            },
            _ => false,
        }
    }

    /// Whether the caller handed us something unusable, as opposed to the
    /// database misbehaving.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConnectionString | Self::UnsupportedDialect(_) | Self::InvalidOptions(_)
        )
    }

    pub(crate) fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions(reason.into())
    }

    /// `map_err` adapter for driver errors during a named operation.
    pub(crate) fn operation<E: Into<DriverError>>(op: &'static str) -> impl FnOnce(E) -> Self {
        move |err| Self::Operation { op, source: err.into() }
    }

    /// `map_err` adapter for initialisation failures. Logs the failure
    /// unless testing mode is on.
    pub(crate) fn connection<E: Into<DriverError>>(
        dialect: Dialect,
        testing: bool,
    ) -> impl FnOnce(E) -> Self {
        move |err| {
            let source = err.into();
            if !testing {
                tracing::error!(%dialect, error = %source, "failed to open connection");
            }
            Self::Connection { dialect, source }
        }
    }
}

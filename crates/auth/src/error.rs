use baileys_authdb_core::{CodecError, SignalDataType};
use baileys_authdb_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the auth-state facade.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A key-store write put a value of one kind under another kind's prefix.
    #[error("value for `{identifier}` is a {actual} entry, expected {expected}")]
    KindMismatch { identifier: String, expected: SignalDataType, actual: SignalDataType },
}

impl AuthError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_transient(),
            Self::Codec(_) | Self::KindMismatch { .. } => false,
        }
    }
}

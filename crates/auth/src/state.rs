//! Auth state: credentials plus key store, bound to one session.

use std::sync::Arc;

use baileys_authdb_core::{AuthenticationCreds, CREDS_IDENTIFIER, crypto};
use baileys_authdb_storage::{AuthStore, AuthStoreExt, Connection};

use crate::error::AuthError;
use crate::keys::SignalKeyStore;

/// What the socket consumes: current credentials and the key store.
#[derive(Debug, Clone)]
pub struct AuthenticationState<S: ?Sized = Connection> {
    pub creds: AuthenticationCreds,
    pub keys: SignalKeyStore<S>,
}

/// Auth state of one session plus its lifecycle operations.
///
/// `creds` is owned in memory; mutate it and call [`AuthState::save_creds`]
/// to persist. Call [`AuthState::close`] only after pending operations settle.
#[derive(Debug)]
pub struct AuthState<S: ?Sized = Connection> {
    pub state: AuthenticationState<S>,
    store: Arc<S>,
}

impl<S: AuthStore> AuthState<S> {
    /// Load the session's credentials from `store`, minting fresh ones when
    /// none are stored yet. Fresh credentials are not written until
    /// [`AuthState::save_creds`].
    pub async fn from_store(store: S) -> Result<Self, AuthError> {
        let store = Arc::new(store);
        let creds = match store.read::<AuthenticationCreds>(CREDS_IDENTIFIER).await? {
            Some(creds) => {
                tracing::debug!(session = store.session(), "loaded stored credentials");
                creds
            },
            None => {
                tracing::info!(session = store.session(), "no stored credentials, generating new ones");
                crypto::init_auth_creds()
            },
        };
        Ok(Self {
            state: AuthenticationState { creds, keys: SignalKeyStore::new(Arc::clone(&store)) },
            store,
        })
    }
}

impl<S: AuthStore + ?Sized> AuthState<S> {
    /// Persist the current in-memory credentials.
    pub async fn save_creds(&self) -> Result<(), AuthError> {
        self.store.store(&self.state.creds, CREDS_IDENTIFIER).await?;
        tracing::debug!(session = self.store.session(), "credentials saved");
        Ok(())
    }

    /// Delete everything stored for this session.
    pub async fn wipe_creds(&self) -> Result<(), AuthError> {
        self.store.wipe().await?;
        Ok(())
    }

    /// Release the underlying pool or client.
    pub async fn close(&self) -> Result<(), AuthError> {
        self.store.close().await?;
        Ok(())
    }

    #[must_use]
    pub fn creds(&self) -> &AuthenticationCreds {
        &self.state.creds
    }

    #[must_use]
    pub fn creds_mut(&mut self) -> &mut AuthenticationCreds {
        &mut self.state.creds
    }

    #[must_use]
    pub fn keys(&self) -> &SignalKeyStore<S> {
        &self.state.keys
    }

    /// The store backing this state.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

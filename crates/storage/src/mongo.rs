//! MongoDB session store.
//!
//! One document per entry: `{session, identifier, value}`. Init pings the
//! database and ensures the `(session, identifier)` unique index, which also
//! creates the collection when it is missing.

use async_trait::async_trait;
use baileys_authdb_core::{MONGO_DEFAULT_PORT, MONGO_FALLBACK_DATABASE};
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{ClientOptions, Credential, IndexOptions, ServerAddress, Tls, TlsOptions};
use mongodb::{Client, Collection, IndexModel};

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::options::{
    ConnectionDescriptor, ConnectionOptions, DocumentOptions, SessionOptions, StoreOptions,
};
use crate::traits::AuthStore;

#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
    session: String,
}

impl MongoStore {
    /// Build the client, ping the target database and ensure the indexes.
    pub async fn init(
        descriptor: &ConnectionDescriptor,
        overrides: &SessionOptions,
    ) -> Result<Self, StorageError> {
        let store = StoreOptions::resolve(descriptor, overrides)?;
        let failed = |testing| StorageError::connection(Dialect::MongoDb, testing);

        let options = client_options(descriptor).await.map_err(|err| match err {
            ClientSetupError::Invalid(err) => err,
            ClientSetupError::Driver(err) => failed(store.testing)(err),
        })?;
        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| MONGO_FALLBACK_DATABASE.to_owned());

        let client = Client::with_options(options).map_err(failed(store.testing))?;
        let db = client.database(&database);
        if let Err(err) = db.run_command(doc! { "ping": 1 }).await {
            client.clone().shutdown().await;
            return Err(failed(store.testing)(err));
        }

        let collection = db.collection::<Document>(&store.store_name);
        tracing::debug!(collection = %store.store_name, "ensuring indexes");
        if let Err(err) = collection.create_indexes(index_models()).await {
            client.clone().shutdown().await;
            return Err(failed(store.testing)(err));
        }

        tracing::info!(
            database = %database,
            collection = %store.store_name,
            session = %store.session,
            "MongoStore initialized"
        );
        Ok(Self { collection, client, session: store.session })
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn filter(&self, identifier: &str) -> Document {
        doc! { "session": self.session.as_str(), "identifier": identifier }
    }
}

/// Same index set as the relational tables: `(session, identifier)` unique,
/// plus one per column.
fn index_models() -> Vec<IndexModel> {
    let index = |name: &str, keys: Document, unique: bool| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().name(name.to_owned()).unique(unique).build())
            .build()
    };
    vec![
        index("idxunique", doc! { "session": 1, "identifier": 1 }, true),
        index("idxsession", doc! { "session": 1 }, false),
        index("idxidentifier", doc! { "identifier": 1 }, false),
    ]
}

#[derive(Debug)]
enum ClientSetupError {
    Invalid(StorageError),
    Driver(mongodb::error::Error),
}

async fn client_options(
    descriptor: &ConnectionDescriptor,
) -> Result<ClientOptions, ClientSetupError> {
    match descriptor {
        ConnectionDescriptor::Url(url) => {
            ClientOptions::parse(url.as_str()).await.map_err(ClientSetupError::Driver)
        },
        ConnectionDescriptor::Options(ConnectionOptions::MongoDb(options)) => {
            structured_options(options).map_err(ClientSetupError::Invalid)
        },
        ConnectionDescriptor::Options(other) => {
            Err(ClientSetupError::Invalid(StorageError::invalid_options(format!(
                "expected mongodb options, got {}",
                other.dialect()
            ))))
        },
    }
}

fn structured_options(options: &DocumentOptions) -> Result<ClientOptions, StorageError> {
    let port = options.port.unwrap_or(MONGO_DEFAULT_PORT);
    let address = ServerAddress::parse(format!("{}:{port}", options.host))
        .map_err(|e| StorageError::invalid_options(format!("host: {e}")))?;
    let args = options.args.clone().unwrap_or_default();

    let mut credential = Credential::default();
    credential.username = Some(options.user.clone());
    credential.password = Some(options.password.clone());
    credential.source = Some(args.auth_source.unwrap_or_else(|| options.database.clone()));

    let mut client = ClientOptions::default();
    client.hosts = vec![address];
    client.credential = Some(credential);
    client.default_database = Some(options.database.clone());
    client.app_name = args.app_name;
    client.repl_set_name = args.replica_set;
    client.direct_connection = args.direct_connection;
    client.tls = args
        .tls
        .map(|enabled| if enabled { Tls::Enabled(TlsOptions::default()) } else { Tls::Disabled });
    Ok(client)
}

#[async_trait]
impl AuthStore for MongoStore {
    fn session(&self) -> &str {
        &self.session
    }

    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError> {
        self.collection
            .update_one(self.filter(identifier), doc! { "$set": { "value": value } })
            .upsert(true)
            .await
            .map_err(StorageError::operation("store"))?;
        tracing::trace!(identifier, "stored");
        Ok(())
    }

    async fn get_value(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        let found = self
            .collection
            .find_one(self.filter(identifier))
            .await
            .map_err(StorageError::operation("read"))?;
        Ok(found.and_then(|document| match document.get("value") {
            Some(Bson::String(value)) => Some(value.clone()),
            _ => None,
        }))
    }

    async fn remove(&self, identifier: &str) -> Result<(), StorageError> {
        self.collection
            .delete_many(self.filter(identifier))
            .await
            .map_err(StorageError::operation("remove"))?;
        tracing::trace!(identifier, "removed");
        Ok(())
    }

    async fn wipe(&self) -> Result<(), StorageError> {
        let result = self
            .collection
            .delete_many(doc! { "session": self.session.as_str() })
            .await
            .map_err(StorageError::operation("wipe"))?;
        tracing::info!(session = %self.session, rows = result.deleted_count, "session wiped");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn structured(value: serde_json::Value) -> DocumentOptions {
        match ConnectionDescriptor::from_json(value).unwrap() {
            ConnectionDescriptor::Options(ConnectionOptions::MongoDb(options)) => options,
            other => panic!("expected mongodb options, got {other:?}"),
        }
    }

    #[test]
    fn structured_options_fill_defaults() {
        let options = structured_options(&structured(json!({
            "dialect": "mongodb", "host": "localhost", "user": "u", "password": "p",
            "database": "auth"
        })))
        .unwrap();
        assert_eq!(options.hosts.len(), 1);
        assert_eq!(options.hosts[0].to_string(), format!("localhost:{MONGO_DEFAULT_PORT}"));
        assert_eq!(options.default_database.as_deref(), Some("auth"));
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("u"));
        assert_eq!(credential.source.as_deref(), Some("auth"));
        assert!(options.tls.is_none());
    }

    #[test]
    fn structured_args_are_applied() {
        let options = structured_options(&structured(json!({
            "dialect": "mongodb", "host": "db.internal", "port": "27018", "user": "u",
            "password": "p", "database": "auth",
            "args": {"authSource": "admin", "replicaSet": "rs0", "tls": true, "directConnection": false}
        })))
        .unwrap();
        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
        assert_eq!(options.direct_connection, Some(false));
        assert!(matches!(options.tls, Some(Tls::Enabled(_))));
        assert_eq!(options.credential.unwrap().source.as_deref(), Some("admin"));
    }

    #[test]
    fn entries_are_unique_per_session_and_identifier() {
        let models = index_models();
        let unique: Vec<_> = models
            .iter()
            .filter(|model| model.options.as_ref().and_then(|o| o.unique) == Some(true))
            .collect();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].keys, doc! { "session": 1, "identifier": 1 });
        assert!(models.iter().all(|model| model.options.as_ref().is_some_and(|o| o.name.is_some())));
    }

    #[tokio::test]
    async fn connection_strings_name_the_database() {
        let options = client_options(&ConnectionDescriptor::from(
            "mongodb://u:p@localhost:27017/auth?authSource=admin",
        ))
        .await
        .unwrap();
        assert_eq!(options.default_database.as_deref(), Some("auth"));
    }
}

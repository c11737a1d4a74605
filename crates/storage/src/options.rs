//! Connection descriptors and session options.
//!
//! Callers hand over either a connection string or a structured options
//! object tagged by `dialect`. Both accept the legacy field aliases
//! (`sessionName`, `tableName`); [`StoreOptions`] is the single normalized
//! shape the backends work from.

use std::collections::BTreeMap;
use std::fmt;

use baileys_authdb_core::{
    DEFAULT_SESSION_NAME, DEFAULT_STORE_NAME, SESSION_COLUMN_WIDTH, env_config,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::StorageError;

/// Where to connect: a connection string or structured options.
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    Url(String),
    Options(ConnectionOptions),
}

impl ConnectionDescriptor {
    /// Accept a JSON string (connection string) or object (structured options).
    pub fn from_json(value: serde_json::Value) -> Result<Self, StorageError> {
        match value {
            serde_json::Value::String(url) => Ok(Self::Url(url)),
            serde_json::Value::Object(mut fields) => {
                // The tag goes through the same alias table as URL schemes.
                let dialect = match fields.get("dialect") {
                    Some(serde_json::Value::String(tag)) => Some(tag.parse::<Dialect>()?),
                    _ => None,
                };
                if let Some(dialect) = dialect {
                    fields.insert("dialect".to_owned(), dialect.as_str().into());
                }
                serde_json::from_value(serde_json::Value::Object(fields))
                    .map(Self::Options)
                    .map_err(|e| StorageError::invalid_options(e.to_string()))
            },
            other => Err(StorageError::invalid_options(format!(
                "expected a connection string or an options object, got {other}"
            ))),
        }
    }
}

/// Connection strings carry passwords, so only the scheme is printed.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => {
                let scheme = url.split_once("://").map_or("?", |(scheme, _)| scheme);
                f.debug_tuple("Url").field(&format_args!("{scheme}://…")).finish()
            },
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
        }
    }
}

impl From<&str> for ConnectionDescriptor {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for ConnectionDescriptor {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<ConnectionOptions> for ConnectionDescriptor {
    fn from(options: ConnectionOptions) -> Self {
        Self::Options(options)
    }
}

/// Structured connection options, tagged by `dialect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dialect")]
pub enum ConnectionOptions {
    #[serde(rename = "mysql")]
    MySql(RelationalOptions<MySqlArgs>),
    #[serde(rename = "pg", alias = "postgres", alias = "postgresql")]
    Postgres(RelationalOptions<PgArgs>),
    #[serde(rename = "mongodb")]
    MongoDb(DocumentOptions),
}

impl ConnectionOptions {
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        match *self {
            Self::MySql(_) => Dialect::MySql,
            Self::Postgres(_) => Dialect::Postgres,
            Self::MongoDb(_) => Dialect::MongoDb,
        }
    }
}

/// Options shared by the relational backends; `A` carries the
/// dialect-specific extras.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationalOptions<A> {
    pub host: String,
    #[serde(default, deserialize_with = "lenient_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default, alias = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, alias = "tableName", skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<A>,
}

impl<A: fmt::Debug> fmt::Debug for RelationalOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("session", &self.session)
            .field("table", &self.table)
            .field("args", &self.args)
            .finish()
    }
}

/// Structured options for the document store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOptions {
    pub host: String,
    #[serde(default, deserialize_with = "lenient_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default, alias = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, alias = "tableName", skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<MongoArgs>,
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("session", &self.session)
            .field("collection", &self.collection)
            .field("args", &self.args)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MySqlArgs {
    /// `disabled`, `preferred`, `required`, `verify_ca` or `verify_identity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Unix socket path; replaces host/port when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PgArgs {
    /// `disable`, `allow`, `prefer`, `require`, `verify-ca` or `verify-full`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    /// Runtime parameters sent at startup, e.g. `search_path`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MongoArgs {
    /// Database holding the user's credentials; defaults to `database`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_connection: Option<bool>,
}

/// Ports arrive as numbers or numeric strings.
fn lenient_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    let port = match Option::<Port>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Port::Number(n)) => n,
        Some(Port::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("port is not a number: {text:?}")))?,
    };
    u16::try_from(port)
        .map(Some)
        .map_err(|_| de::Error::custom(format!("port out of range: {port}")))
}

/// Caller-side overrides, applied when the descriptor leaves a field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    #[serde(default, alias = "sessionName", skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, alias = "tableName", skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Silence connection-failure logs. Also switched on by `BAILEYSAUTH_TESTING`.
    #[serde(default)]
    pub testing: bool,
}

impl SessionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    #[must_use]
    pub const fn testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }
}

/// Normalized per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub session: String,
    /// Table (relational) or collection (document store) name.
    pub store_name: String,
    pub testing: bool,
}

impl StoreOptions {
    /// Merge descriptor fields over `overrides` over defaults.
    pub fn resolve(
        descriptor: &ConnectionDescriptor,
        overrides: &SessionOptions,
    ) -> Result<Self, StorageError> {
        let (session, store_name) = match descriptor {
            ConnectionDescriptor::Url(_) => (None, None),
            ConnectionDescriptor::Options(ConnectionOptions::MySql(o)) => {
                (o.session.as_deref(), o.table.as_deref())
            },
            ConnectionDescriptor::Options(ConnectionOptions::Postgres(o)) => {
                (o.session.as_deref(), o.table.as_deref())
            },
            ConnectionDescriptor::Options(ConnectionOptions::MongoDb(o)) => {
                (o.session.as_deref(), o.collection.as_deref())
            },
        };
        let is_document = matches!(
            descriptor,
            ConnectionDescriptor::Options(ConnectionOptions::MongoDb(_))
        ) || matches!(
            descriptor,
            ConnectionDescriptor::Url(url) if url.to_ascii_lowercase().starts_with("mongodb")
        );
        let override_store = if is_document {
            overrides.collection.as_deref().or(overrides.table.as_deref())
        } else {
            overrides.table.as_deref()
        };

        let session = session.or(overrides.session.as_deref()).unwrap_or(DEFAULT_SESSION_NAME);
        let store_name = store_name.or(override_store).unwrap_or(DEFAULT_STORE_NAME);

        if session.is_empty() || session.chars().count() > SESSION_COLUMN_WIDTH {
            return Err(StorageError::invalid_options(format!(
                "session name must be 1..={SESSION_COLUMN_WIDTH} characters, got {:?}",
                session
            )));
        }
        if store_name.trim().is_empty() {
            return Err(StorageError::invalid_options("table/collection name is empty"));
        }

        Ok(Self {
            session: session.to_owned(),
            store_name: store_name.to_owned(),
            testing: overrides.testing || env_config::testing_mode(),
        })
    }
}

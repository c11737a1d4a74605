//! PostgreSQL session store using sqlx.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use baileys_authdb_core::{PG_DEFAULT_PORT, env_config};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::options::{
    ConnectionDescriptor, ConnectionOptions, PgArgs, RelationalOptions, SessionOptions,
    StoreOptions,
};
use crate::schema::{SqlStatements, pg_statements};
use crate::traits::AuthStore;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    session: String,
    table: String,
    sql: SqlStatements,
}

impl PgStore {
    /// Connect, create the table and its indexes if missing.
    pub async fn init(
        descriptor: &ConnectionDescriptor,
        overrides: &SessionOptions,
    ) -> Result<Self, StorageError> {
        let store = StoreOptions::resolve(descriptor, overrides)?;
        let connect = connect_options(descriptor)?;
        let failed = |testing| StorageError::connection(Dialect::Postgres, testing);

        let pool = PgPoolOptions::new()
            .max_connections(env_config::max_connections())
            .acquire_timeout(Duration::from_secs(env_config::acquire_timeout_secs()))
            .connect_with(connect)
            .await
            .map_err(failed(store.testing))?;

        let sql = pg_statements(&store.store_name);
        tracing::debug!(table = %store.store_name, "ensuring schema");
        for statement in &sql.create {
            if let Err(err) = sqlx::query(statement).execute(&pool).await {
                pool.close().await;
                return Err(failed(store.testing)(err));
            }
        }

        tracing::info!(table = %store.store_name, session = %store.session, "PgStore initialized");
        Ok(Self { pool, session: store.session, table: store.store_name, sql })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn connect_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions, StorageError> {
    match descriptor {
        ConnectionDescriptor::Url(url) => {
            // sqlx only knows the postgres/postgresql schemes.
            let url = match url.split_once("://") {
                Some((_, rest)) => format!("postgres://{rest}"),
                None => return Err(StorageError::InvalidConnectionString),
            };
            PgConnectOptions::from_str(&url)
                .map_err(|e| StorageError::invalid_options(format!("pg connection string: {e}")))
        },
        ConnectionDescriptor::Options(ConnectionOptions::Postgres(options)) => {
            structured_options(options)
        },
        ConnectionDescriptor::Options(other) => Err(StorageError::invalid_options(format!(
            "expected pg options, got {}",
            other.dialect()
        ))),
    }
}

fn structured_options(
    options: &RelationalOptions<PgArgs>,
) -> Result<PgConnectOptions, StorageError> {
    let mut connect = PgConnectOptions::new()
        .host(&options.host)
        .port(options.port.unwrap_or(PG_DEFAULT_PORT))
        .username(&options.user)
        .password(&options.password)
        .database(&options.database);

    if let Some(args) = &options.args {
        if let Some(mode) = &args.ssl_mode {
            let mode = PgSslMode::from_str(mode)
                .map_err(|e| StorageError::invalid_options(format!("sslMode: {e}")))?;
            connect = connect.ssl_mode(mode);
        }
        if let Some(name) = &args.application_name {
            connect = connect.application_name(name);
        }
        if !args.options.is_empty() {
            connect = connect.options(args.options.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }
    Ok(connect)
}

#[async_trait]
impl AuthStore for PgStore {
    fn session(&self) -> &str {
        &self.session
    }

    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(&self.sql.upsert)
            .bind(&self.session)
            .bind(identifier)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(StorageError::operation("store"))?;
        tracing::trace!(identifier, "stored");
        Ok(())
    }

    async fn get_value(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        let value: Option<Option<String>> = sqlx::query_scalar(&self.sql.select)
            .bind(identifier)
            .bind(&self.session)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::operation("read"))?;
        Ok(value.flatten())
    }

    async fn remove(&self, identifier: &str) -> Result<(), StorageError> {
        sqlx::query(&self.sql.delete)
            .bind(identifier)
            .bind(&self.session)
            .execute(&self.pool)
            .await
            .map_err(StorageError::operation("remove"))?;
        tracing::trace!(identifier, "removed");
        Ok(())
    }

    async fn wipe(&self) -> Result<(), StorageError> {
        let result = sqlx::query(&self.sql.wipe)
            .bind(&self.session)
            .execute(&self.pool)
            .await
            .map_err(StorageError::operation("wipe"))?;
        tracing::info!(session = %self.session, rows = result.rows_affected(), "session wiped");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

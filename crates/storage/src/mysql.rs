//! MySQL session store using sqlx.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use baileys_authdb_core::{MYSQL_DEFAULT_PORT, env_config};
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::options::{
    ConnectionDescriptor, ConnectionOptions, MySqlArgs, RelationalOptions, SessionOptions,
    StoreOptions,
};
use crate::schema::{SqlStatements, mysql_statements};
use crate::traits::AuthStore;

#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
    session: String,
    table: String,
    sql: SqlStatements,
}

impl MySqlStore {
    /// Connect and create the table if missing.
    pub async fn init(
        descriptor: &ConnectionDescriptor,
        overrides: &SessionOptions,
    ) -> Result<Self, StorageError> {
        let store = StoreOptions::resolve(descriptor, overrides)?;
        let connect = connect_options(descriptor)?;
        let failed = |testing| StorageError::connection(Dialect::MySql, testing);

        let pool = MySqlPoolOptions::new()
            .max_connections(env_config::max_connections())
            .acquire_timeout(Duration::from_secs(env_config::acquire_timeout_secs()))
            .connect_with(connect)
            .await
            .map_err(failed(store.testing))?;

        let sql = mysql_statements(&store.store_name);
        tracing::debug!(table = %store.store_name, "ensuring schema");
        for statement in &sql.create {
            if let Err(err) = sqlx::query(statement).execute(&pool).await {
                pool.close().await;
                return Err(failed(store.testing)(err));
            }
        }

        tracing::info!(table = %store.store_name, session = %store.session, "MySqlStore initialized");
        Ok(Self { pool, session: store.session, table: store.store_name, sql })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn connect_options(descriptor: &ConnectionDescriptor) -> Result<MySqlConnectOptions, StorageError> {
    match descriptor {
        ConnectionDescriptor::Url(url) => {
            let url = match url.split_once("://") {
                Some((_, rest)) => format!("mysql://{rest}"),
                None => return Err(StorageError::InvalidConnectionString),
            };
            MySqlConnectOptions::from_str(&url)
                .map_err(|e| StorageError::invalid_options(format!("mysql connection string: {e}")))
        },
        ConnectionDescriptor::Options(ConnectionOptions::MySql(options)) => {
            structured_options(options)
        },
        ConnectionDescriptor::Options(other) => Err(StorageError::invalid_options(format!(
            "expected mysql options, got {}",
            other.dialect()
        ))),
    }
}

fn structured_options(
    options: &RelationalOptions<MySqlArgs>,
) -> Result<MySqlConnectOptions, StorageError> {
    let mut connect = MySqlConnectOptions::new()
        .host(&options.host)
        .port(options.port.unwrap_or(MYSQL_DEFAULT_PORT))
        .username(&options.user)
        .password(&options.password)
        .database(&options.database);

    if let Some(args) = &options.args {
        if let Some(mode) = &args.ssl_mode {
            let mode = MySqlSslMode::from_str(mode)
                .map_err(|e| StorageError::invalid_options(format!("sslMode: {e}")))?;
            connect = connect.ssl_mode(mode);
        }
        if let Some(charset) = &args.charset {
            connect = connect.charset(charset);
        }
        if let Some(socket) = &args.socket {
            connect = connect.socket(socket);
        }
    }
    Ok(connect)
}

#[async_trait]
impl AuthStore for MySqlStore {
    fn session(&self) -> &str {
        &self.session
    }

    async fn put_value(&self, identifier: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(&self.sql.upsert)
            .bind(&self.session)
            .bind(identifier)
            .bind(value)
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn connection_strings_parse() {
        let connect =
            connect_options(&ConnectionDescriptor::from("mysql://root:pw@db.internal:3307/auth"))
                .unwrap();
        assert_eq!(connect.get_host(), "db.internal");
        assert_eq!(connect.get_port(), 3307);
        assert_eq!(connect.get_database(), Some("auth"));
    }

    #[test]
    fn structured_options_default_the_port() {
        let descriptor = ConnectionDescriptor::from_json(json!({
            "dialect": "mysql", "host": "localhost", "user": "root", "password": "pw",
            "database": "auth", "args": {"sslMode": "preferred", "charset": "utf8mb4"}
        }))
        .unwrap();
        let connect = connect_options(&descriptor).unwrap();
        assert_eq!(connect.get_port(), MYSQL_DEFAULT_PORT);
        assert_eq!(connect.get_database(), Some("auth"));
    }

    #[test]
    fn bad_ssl_mode_is_rejected() {
        let descriptor = ConnectionDescriptor::from_json(json!({
            "dialect": "mysql", "host": "h", "user": "u", "database": "d",
            "args": {"sslMode": "maybe"}
        }))
        .unwrap();
        assert!(matches!(connect_options(&descriptor), Err(StorageError::InvalidOptions(_))));
    }
}

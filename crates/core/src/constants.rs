//! Shared constants for baileys-authdb.

/// Table (relational) or collection (document store) name used when none is given.
pub const DEFAULT_STORE_NAME: &str = "baileys_session";

/// Session namespace used when none is given.
pub const DEFAULT_SESSION_NAME: &str = "baileys_session";

/// Identifier under which the credentials blob is stored.
pub const CREDS_IDENTIFIER: &str = "creds";

/// Width of the `session` column.
pub const SESSION_COLUMN_WIDTH: usize = 40;

/// Width of the `identifier` column.
pub const IDENTIFIER_COLUMN_WIDTH: usize = 100;

pub const MYSQL_DEFAULT_PORT: u16 = 3306;

pub const PG_DEFAULT_PORT: u16 = 5432;

pub const MONGO_DEFAULT_PORT: u16 = 27017;

/// Database the MongoDB driver falls back to when the URI names none.
pub const MONGO_FALLBACK_DATABASE: &str = "test";

/// Env var that switches on testing mode (silences connection-failure logs).
pub const TESTING_ENV_VAR: &str = "BAILEYSAUTH_TESTING";

/// Env var overriding the relational pool size.
pub const MAX_CONNECTIONS_ENV_VAR: &str = "BAILEYS_AUTHDB_MAX_CONNECTIONS";

/// Env var overriding the relational pool acquire timeout.
pub const ACQUIRE_TIMEOUT_ENV_VAR: &str = "BAILEYS_AUTHDB_ACQUIRE_TIMEOUT_SECS";

/// One logical connection per auth state.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;

pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

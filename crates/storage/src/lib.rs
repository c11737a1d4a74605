//! Storage layer for baileys-authdb
//!
//! Session-scoped key/value stores on MySQL, PostgreSQL and MongoDB behind
//! one [`AuthStore`] trait, plus the resolver that picks a backend from a
//! connection string or structured options.

#[cfg(not(any(feature = "mysql", feature = "postgres", feature = "mongodb")))]
compile_error!("enable at least one backend feature: `mysql`, `postgres` or `mongodb`");

pub mod backend;
pub mod dialect;
pub mod error;
#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod options;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(feature = "mysql", feature = "postgres"))]
mod schema;
pub mod traits;

pub use backend::{Connection, connect};
pub use dialect::{Dialect, resolve};
pub use error::{DriverError, StorageError};
pub use options::{
    ConnectionDescriptor, ConnectionOptions, DocumentOptions, MongoArgs, MySqlArgs, PgArgs,
    RelationalOptions, SessionOptions, StoreOptions,
};
pub use traits::{AuthStore, AuthStoreExt};

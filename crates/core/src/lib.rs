//! Core types and helpers for baileys-authdb
//!
//! Credential and key-store value types shared by the storage backends and
//! the auth-state facade, plus the JSON codec that keeps binary fields
//! intact across every backend.

pub mod codec;
pub mod constants;
pub mod crypto;
pub mod env_config;
mod creds;
mod error;
mod signal;
pub mod sync_key;

pub use codec::Buffer;
pub use constants::*;
pub use creds::*;
pub use error::*;
pub use signal::*;
pub use sync_key::{AppStateSyncKey, FingerprintState, decode_app_state_sync_key};

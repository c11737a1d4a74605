//! Environment variable parsing with warn-level logging for invalid values.

use crate::constants::{
    ACQUIRE_TIMEOUT_ENV_VAR, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS,
    MAX_CONNECTIONS_ENV_VAR, TESTING_ENV_VAR,
};

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently.
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Read a boolean flag. Unset or unrecognized values count as `false`;
/// unrecognized values are logged.
pub fn env_flag(var: &str) -> bool {
    let Ok(raw) = std::env::var(var) else {
        return false;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!(var, value = %raw, "unrecognized boolean env var, treating as false");
            false
        },
    }
}

/// Whether testing mode is on (connection failures are not logged).
pub fn testing_mode() -> bool {
    env_flag(TESTING_ENV_VAR)
}

/// Maximum pooled connections for the relational backends.
pub fn max_connections() -> u32 {
    env_parse_with_default(MAX_CONNECTIONS_ENV_VAR, DEFAULT_MAX_CONNECTIONS).max(1)
}

/// Seconds to wait for a pooled connection.
pub fn acquire_timeout_secs() -> u64 {
    env_parse_with_default(ACQUIRE_TIMEOUT_ENV_VAR, DEFAULT_ACQUIRE_TIMEOUT_SECS)
}

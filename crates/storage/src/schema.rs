//! Table DDL and the per-table statement set of the relational backends.
//!
//! Table names come from configuration, so they are quoted rather than bound.

use baileys_authdb_core::{IDENTIFIER_COLUMN_WIDTH, SESSION_COLUMN_WIDTH};

/// MySQL identifier in backticks, embedded backticks doubled.
pub(crate) fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// PostgreSQL identifier in double quotes, embedded quotes doubled.
pub(crate) fn quote_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Statements one relational store runs, rendered once at init.
#[derive(Debug, Clone)]
pub(crate) struct SqlStatements {
    pub create: Vec<String>,
    pub upsert: String,
    pub select: String,
    pub delete: String,
    pub wipe: String,
}

#[cfg(feature = "mysql")]
pub(crate) fn mysql_statements(table: &str) -> SqlStatements {
    let table = quote_mysql(table);
    SqlStatements {
        create: vec![format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                session VARCHAR({SESSION_COLUMN_WIDTH}) NOT NULL,
                identifier VARCHAR({IDENTIFIER_COLUMN_WIDTH}) NOT NULL,
                value TEXT DEFAULT NULL,
                UNIQUE KEY idxunique (session, identifier),
                KEY idxsession (session),
                KEY idxidentifier (identifier)
            ) ENGINE=InnoDB"
        )],
        upsert: format!(
            "INSERT INTO {table} (session, identifier, value) VALUES (?, ?, ?)
             ON DUPLICATE KEY UPDATE value = ?"
        ),
        select: format!("SELECT value FROM {table} WHERE identifier = ? AND session = ?"),
        delete: format!("DELETE FROM {table} WHERE identifier = ? AND session = ?"),
        wipe: format!("DELETE FROM {table} WHERE session = ?"),
    }
}

/// PostgreSQL index names share one namespace per schema, so they are
/// derived from the table name.
#[cfg(feature = "postgres")]
pub(crate) fn pg_statements(table: &str) -> SqlStatements {
    let quoted = quote_pg(table);
    let unique = quote_pg(&format!("{table}_idx_unique"));
    let by_session = quote_pg(&format!("{table}_idx_session"));
    let by_identifier = quote_pg(&format!("{table}_idx_identifier"));
    SqlStatements {
        create: vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {quoted} (
                    session VARCHAR({SESSION_COLUMN_WIDTH}) NOT NULL,
                    identifier VARCHAR({IDENTIFIER_COLUMN_WIDTH}) NOT NULL,
                    value TEXT DEFAULT NULL,
                    CONSTRAINT {unique} UNIQUE (session, identifier)
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS {by_session} ON {quoted} (session)"),
            format!("CREATE INDEX IF NOT EXISTS {by_identifier} ON {quoted} (identifier)"),
        ],
        upsert: format!(
            "INSERT INTO {quoted} (session, identifier, value) VALUES ($1, $2, $3)
             ON CONFLICT (session, identifier) DO UPDATE SET value = EXCLUDED.value"
        ),
        select: format!("SELECT value FROM {quoted} WHERE identifier = $1 AND session = $2"),
        delete: format!("DELETE FROM {quoted} WHERE identifier = $1 AND session = $2"),
        wipe: format!("DELETE FROM {quoted} WHERE session = $1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_mysql("baileys_session"), "`baileys_session`");
        assert_eq!(quote_mysql("we`ird"), "`we``ird`");
        assert_eq!(quote_pg("baileys_session"), "\"baileys_session\"");
        assert_eq!(quote_pg("we\"ird"), "\"we\"\"ird\"");
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn mysql_statements_use_positional_placeholders() {
        let sql = mysql_statements("auth");
        assert_eq!(sql.create.len(), 1);
        assert!(sql.create[0].contains("CREATE TABLE IF NOT EXISTS `auth`"));
        assert!(sql.create[0].contains("UNIQUE KEY idxunique (session, identifier)"));
        assert!(sql.upsert.contains("ON DUPLICATE KEY UPDATE value = ?"));
        assert_eq!(sql.upsert.matches('?').count(), 4);
        assert_eq!(sql.wipe, "DELETE FROM `auth` WHERE session = ?");
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn pg_statements_use_numbered_placeholders_and_scoped_indexes() {
        let sql = pg_statements("auth");
        assert_eq!(sql.create.len(), 3);
        assert!(sql.create[0].contains("CONSTRAINT \"auth_idx_unique\" UNIQUE (session, identifier)"));
        assert!(sql.create[1].contains("\"auth_idx_session\" ON \"auth\" (session)"));
        assert!(sql.upsert.contains("ON CONFLICT (session, identifier) DO UPDATE SET value = EXCLUDED.value"));
        assert_eq!(sql.wipe, "DELETE FROM \"auth\" WHERE session = $1");
        assert!(!sql.wipe.contains('?'));
    }
}

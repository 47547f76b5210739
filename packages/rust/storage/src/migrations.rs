//! SQL migration definitions for the document database.
//!
//! Migrations are applied in order on database open. Each migration records
//! its own version in `schema_migrations` as its last statement.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: documents",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per document, body is the lossless JSON form
CREATE TABLE IF NOT EXISTS documents (
    id         TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    topic      TEXT NOT NULL,
    saved_at   TEXT NOT NULL,
    body       TEXT NOT NULL,
    sha256     TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Index documents by topic",
            sql: r#"
CREATE INDEX IF NOT EXISTS idx_documents_topic ON documents(topic);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}

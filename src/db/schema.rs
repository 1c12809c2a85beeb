//! Database schema and migrations.
//!
//! Migrations are applied in order; the schema_version table records which
//! ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: subscribers and their delivery watermark
    r#"
CREATE TABLE subscribers (
    chat_id     INTEGER PRIMARY KEY,      -- Telegram chat identifier
    last_post   TEXT NOT NULL,            -- watermark, RFC3339 UTC, fixed width
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: listing order for the fan-out
    r#"
CREATE INDEX idx_subscribers_created_at ON subscribers(created_at);
"#,
];

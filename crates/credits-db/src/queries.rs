//! SQL text for each supported dialect.
//!
//! The statements are identical apart from placeholder syntax.

use crate::config::Dialect;

/// Idempotent schema creation, valid for both dialects.
pub const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS credits_users (
        uuid TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        credits BIGINT NOT NULL DEFAULT 0 CHECK (credits >= 0),
        redeemed BIGINT NOT NULL DEFAULT 0 CHECK (redeemed >= 0)
    )",
    "CREATE INDEX IF NOT EXISTS idx_credits_users_username ON credits_users (LOWER(username))",
    "CREATE INDEX IF NOT EXISTS idx_credits_users_credits ON credits_users (credits)",
];

/// Statements used by the record store.
pub struct Queries {
    pub get_by_id: &'static str,
    pub get_by_name: &'static str,
    pub insert: &'static str,
    pub update: &'static str,
    pub rename: &'static str,
    pub page: &'static str,
    pub all: &'static str,
    pub count: &'static str,
}

const POSTGRES: Queries = Queries {
    get_by_id: "SELECT uuid, username, credits, redeemed FROM credits_users WHERE uuid = $1",
    get_by_name: "SELECT uuid, username, credits, redeemed FROM credits_users \
                  WHERE LOWER(username) = LOWER($1) ORDER BY uuid LIMIT 1",
    insert: "INSERT INTO credits_users (uuid, username, credits, redeemed) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (uuid) DO NOTHING",
    update: "UPDATE credits_users SET username = $1, credits = $2, redeemed = $3 WHERE uuid = $4",
    rename: "UPDATE credits_users SET username = $1 WHERE uuid = $2",
    page: "SELECT uuid, username, credits, redeemed FROM credits_users \
           ORDER BY credits DESC, uuid ASC LIMIT $1 OFFSET $2",
    all: "SELECT uuid, username, credits, redeemed FROM credits_users ORDER BY uuid",
    count: "SELECT COUNT(*) FROM credits_users",
};

const SQLITE: Queries = Queries {
    get_by_id: "SELECT uuid, username, credits, redeemed FROM credits_users WHERE uuid = ?",
    get_by_name: "SELECT uuid, username, credits, redeemed FROM credits_users \
                  WHERE LOWER(username) = LOWER(?) ORDER BY uuid LIMIT 1",
    insert: "INSERT INTO credits_users (uuid, username, credits, redeemed) \
             VALUES (?, ?, ?, ?) ON CONFLICT (uuid) DO NOTHING",
    update: "UPDATE credits_users SET username = ?, credits = ?, redeemed = ? WHERE uuid = ?",
    rename: "UPDATE credits_users SET username = ? WHERE uuid = ?",
    page: "SELECT uuid, username, credits, redeemed FROM credits_users \
           ORDER BY credits DESC, uuid ASC LIMIT ? OFFSET ?",
    all: "SELECT uuid, username, credits, redeemed FROM credits_users ORDER BY uuid",
    count: "SELECT COUNT(*) FROM credits_users",
};

/// Statement set for a dialect.
pub const fn for_dialect(dialect: Dialect) -> &'static Queries {
    match dialect {
        Dialect::Postgres => &POSTGRES,
        Dialect::Sqlite => &SQLITE,
    }
}

//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "wizard_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY,
                catalogue_id TEXT NOT NULL,
                title TEXT NOT NULL,
                href TEXT NOT NULL,
                previous_page INTEGER,
                next_page INTEGER,
                visibility TEXT NOT NULL DEFAULT '{"kind":"always"}',
                require_session INTEGER NOT NULL DEFAULT 1,
                is_invalidated INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_pages_catalogue ON pages(catalogue_id);

            CREATE TABLE IF NOT EXISTS sessions (
                result_id TEXT PRIMARY KEY,
                valid_for TEXT NOT NULL DEFAULT 'latest',
                session_origin TEXT REFERENCES sessions(result_id) ON DELETE SET NULL,
                language_code TEXT,
                user_agent TEXT,
                referrer TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS facette_selections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(result_id) ON DELETE CASCADE,
                facette_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                UNIQUE (session_id, facette_id)
            );
            CREATE INDEX IF NOT EXISTS idx_selections_session ON facette_selections(session_id);

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                target_page INTEGER,
                child_of INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_categories_child_of ON categories(child_of);

            CREATE TABLE IF NOT EXISTS choosables (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                clicked INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS choosable_meta (
                choosable_id INTEGER NOT NULL REFERENCES choosables(id) ON DELETE CASCADE,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                PRIMARY KEY (choosable_id, meta_key)
            );
        "#,
    },
];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` table if it doesn't exist.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    let final_version = get_current_version(conn).await?;
    tracing::info!(version = final_version, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => {
            let version: i64 = row.get(0).map_err(|e| {
                DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
            })?;
            Ok(version)
        }
        None => Ok(0),
    }
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}

//! Schema migrations for the entry store.
//!
//! Each migration commits in one transaction with the row recording it, so
//! an interrupted open leaves the schema at the previous version. Statements
//! use `IF NOT EXISTS`; two agents opening the same file at once both succeed.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, name: "partitions", sql: include_str!("../../migrations/001_partitions.sql") }];

/// Highest version this build knows how to apply.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn applied_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the schema up to date. Returns the versions applied by this call.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the migration whose SQL failed,
/// or `Error::Database` if the version table cannot be read.
pub async fn run(conn: &Connection) -> Result<Vec<i64>, Error> {
    let applied = conn
        .call(|conn| -> Result<Vec<i64>, Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL
                )",
            )?;

            let current = applied_version(conn)?;
            if current > latest_version() {
                return Err(Error::MigrationFailed(format!(
                    "database schema {current} is newer than supported {}",
                    latest_version()
                )));
            }

            let mut applied = Vec::new();
            for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
                let tx = conn.transaction()?;
                tx.execute_batch(migration.sql)
                    .map_err(|e| Error::MigrationFailed(format!("{} {}: {e}", migration.version, migration.name)))?;
                tx.execute(
                    "INSERT OR IGNORE INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                    params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                applied.push(migration.version);
            }
            Ok(applied)
        })
        .await?;

    for version in &applied {
        tracing::info!(version, "applied schema migration");
    }
    Ok(applied)
}

/// Version currently recorded in the database, `0` before the first run.
pub async fn schema_version(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> {
        let has_table: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='_migrations')",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Ok(0);
        }
        applied_version(conn)
    })
    .await
    .map_err(Error::from)
}

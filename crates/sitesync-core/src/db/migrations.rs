//! Schema migrations for the local state database

use crate::error::Result;
use libsql::Connection;

/// Ordered schema steps; each entry runs once, inside its own transaction.
const MIGRATIONS: &[(i32, &[&str])] = &[(
    1,
    &[
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS local_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
    ],
)];

pub async fn run(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn).await?;

    for (version, statements) in MIGRATIONS.iter().filter(|(version, _)| *version > applied) {
        apply(conn, *version, statements).await?;
        tracing::debug!("Local database migrated to schema v{version}");
    }

    Ok(())
}

async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for statement in statements {
        if let Err(error) = conn.execute(statement, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }
    }
    if let Err(error) = conn
        .execute("INSERT INTO schema_version (version) VALUES (?1)", libsql::params![version])
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }

    conn.execute("COMMIT", ()).await?;
    Ok(())
}

/// Highest applied version, or 0 for a fresh file.
async fn schema_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    if rows.next().await?.is_none() {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i32>(0)?),
        None => Ok(0),
    }
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Returns the notepai data directory.
/// Location: `~/.local/share/notepai` (XDG-compliant)
pub fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "notepai").context("Could not determine data directory")?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.to_path_buf())
}

/// Returns the path to the default notepai database.
pub fn db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("notepai.db"))
}

/// Opens (or creates) the default database and returns the connection.
pub fn open_db() -> Result<Connection> {
    let path = db_path()?;
    open_db_at(&path)
}

/// Opens (or creates) a database at an explicit path.
/// Enables WAL mode and creates the key-value table.
pub fn open_db_at(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    init_kv(&conn)?;
    tracing::debug!(path = %path.display(), "opened database");

    Ok(conn)
}

/// Open an in-memory database for testing.
pub fn open_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_kv(&conn)?;
    Ok(conn)
}

// ── Key-value storage ────────────────────────────────────────────────

/// Create the namespaced key-value table used for local persistence.
pub fn init_kv(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

/// Read the value stored under `key`, if any.
pub fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Store `value` under `key`, replacing any previous value.
pub fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Remove the value stored under `key`.
pub fn kv_delete(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_roundtrip() {
        let conn = open_memory_db().unwrap();
        assert_eq!(kv_get(&conn, "missing").unwrap(), None);

        kv_set(&conn, "note", "hello").unwrap();
        assert_eq!(kv_get(&conn, "note").unwrap().as_deref(), Some("hello"));

        // Overwrite keeps a single row
        kv_set(&conn, "note", "world").unwrap();
        assert_eq!(kv_get(&conn, "note").unwrap().as_deref(), Some("world"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_kv_delete() {
        let conn = open_memory_db().unwrap();
        kv_set(&conn, "a", "1").unwrap();
        kv_delete(&conn, "a").unwrap();
        assert_eq!(kv_get(&conn, "a").unwrap(), None);
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = open_memory_db().unwrap();
        init_kv(&conn).unwrap();
        init_kv(&conn).unwrap();
    }
}

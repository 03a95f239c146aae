use anyhow::Result;
use notepai_core::db;
use rusqlite::Connection;

/// Key holding the note text.
pub const NOTE_KEY: &str = "notepai-note";

/// Load the saved note, or an empty one.
pub fn load_note(conn: &Connection) -> Result<String> {
    Ok(db::kv_get(conn, NOTE_KEY)?.unwrap_or_default())
}

pub fn save_note(conn: &Connection, text: &str) -> Result<()> {
    db::kv_set(conn, NOTE_KEY, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_roundtrip() {
        let conn = db::open_memory_db().unwrap();
        assert_eq!(load_note(&conn).unwrap(), "");
        save_note(&conn, "groceries\n- milk").unwrap();
        assert_eq!(load_note(&conn).unwrap(), "groceries\n- milk");
    }
}

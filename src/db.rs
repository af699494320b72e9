use crate::models::StoredCredential;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

// Fixed key names; the signed-out state is "no access_token row".
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_EXPIRES_IN: &str = "expires_in";

pub fn open_or_create(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS credentials (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
        );",
    )?;
    Ok(())
}

pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, strftime('%s','now')) ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = strftime('%s','now')",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM credentials WHERE key = ?1 LIMIT 1")?;
    let row = stmt
        .query_row(params![key], |r| r.get::<_, String>(0))
        .optional()?;
    Ok(row)
}

pub fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM credentials WHERE key = ?1", params![key])?;
    Ok(())
}

/// Persist a credential. The refresh token row is only touched when a new
/// value is supplied; refresh responses usually omit it and the previous one
/// stays valid.
pub fn save_credential(
    conn: &Connection,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: i64,
) -> Result<()> {
    set_value(conn, KEY_ACCESS_TOKEN, access_token)?;
    if let Some(rt) = refresh_token {
        set_value(conn, KEY_REFRESH_TOKEN, rt)?;
    }
    set_value(conn, KEY_EXPIRES_IN, &expires_at.to_string())?;
    Ok(())
}

/// Load the stored credential, or None when signed out.
pub fn load_credential(conn: &Connection) -> Result<Option<StoredCredential>> {
    let access_token = match get_value(conn, KEY_ACCESS_TOKEN)? {
        Some(t) => t,
        None => return Ok(None),
    };
    let refresh_token = get_value(conn, KEY_REFRESH_TOKEN)?;
    let expires_at = get_value(conn, KEY_EXPIRES_IN)?.and_then(|s| s.parse::<i64>().ok());
    Ok(Some(StoredCredential {
        access_token,
        refresh_token,
        expires_at,
    }))
}

/// Remove all credential rows. Sign-out is a plain local clear.
pub fn clear_credential(conn: &Connection) -> Result<()> {
    delete_value(conn, KEY_ACCESS_TOKEN)?;
    delete_value(conn, KEY_REFRESH_TOKEN)?;
    delete_value(conn, KEY_EXPIRES_IN)?;
    Ok(())
}

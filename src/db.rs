//! Sqlite cache of catalog search resolutions: `(platform, normalized key)`
//! to the platform-native track that a search returned for it.

use crate::models::{NormalizedKey, Platform, RawTrack};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS track_resolution (
    platform     TEXT    NOT NULL,
    title_key    TEXT    NOT NULL,
    artist_key   TEXT    NOT NULL,
    native_id    TEXT    NOT NULL,
    title        TEXT    NOT NULL,
    artist       TEXT    NOT NULL,
    album        TEXT,
    duration_ms  INTEGER,
    resolved_at  INTEGER NOT NULL,
    PRIMARY KEY (platform, title_key, artist_key)
);
";

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
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Lookup a cached resolution for `key` on `platform`.
pub fn get_resolution(conn: &Connection, platform: Platform, key: &NormalizedKey) -> Result<Option<RawTrack>> {
    let mut stmt = conn.prepare(
        "SELECT native_id, title, artist, album, duration_ms FROM track_resolution WHERE platform = ?1 AND title_key = ?2 AND artist_key = ?3 LIMIT 1",
    )?;
    let row = stmt
        .query_row(params![platform.slug(), key.title, key.artist], |r| {
            let duration_ms: Option<i64> = r.get(4)?;
            Ok(RawTrack {
                native_id: r.get(0)?,
                title: r.get(1)?,
                artists: vec![r.get::<_, String>(2)?],
                album: r.get(3)?,
                duration_ms: duration_ms.map(|d| d.max(0) as u64),
            })
        })
        .optional()?;
    Ok(row)
}

/// Upsert the resolution of `key` on `platform`.
pub fn upsert_resolution(conn: &Connection, platform: Platform, key: &NormalizedKey, resolved: &RawTrack) -> Result<()> {
    let artist = resolved.artists.first().map(String::as_str).unwrap_or("");
    conn.execute(
        "INSERT INTO track_resolution (platform, title_key, artist_key, native_id, title, artist, album, duration_ms, resolved_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, strftime('%s','now')) ON CONFLICT(platform, title_key, artist_key) DO UPDATE SET native_id = excluded.native_id, title = excluded.title, artist = excluded.artist, album = excluded.album, duration_ms = excluded.duration_ms, resolved_at = strftime('%s','now')",
        params![
            platform.slug(),
            key.title,
            key.artist,
            resolved.native_id,
            resolved.title,
            artist,
            resolved.album,
            resolved.duration_ms.map(|d| d as i64),
        ],
    )?;
    Ok(())
}

/// Drop every cached resolution for `platform`. Returns the number of rows removed.
pub fn clear_resolutions(conn: &mut Connection, platform: Platform) -> Result<usize> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM track_resolution WHERE platform = ?1", params![platform.slug()])?;
    tx.commit()?;
    Ok(removed)
}

pub fn count_resolutions(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM track_resolution", [], |r| r.get(0))?)
}

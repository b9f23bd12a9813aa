use playsync::db;
use playsync::models::{Platform, RawTrack};
use playsync::normalize::normalized_key;
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn resolution_upsert_and_lookup() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).unwrap();

    let key = normalized_key("Shape of You", "Ed Sheeran").unwrap();
    assert!(db::get_resolution(&conn, Platform::AppleMusic, &key).unwrap().is_none());

    let hit = RawTrack::new("Shape of You", "Ed Sheeran")
        .with_album("Divide")
        .with_duration_ms(233_713)
        .with_native_id("am:1");
    db::upsert_resolution(&conn, Platform::AppleMusic, &key, &hit).unwrap();
    let cached = db::get_resolution(&conn, Platform::AppleMusic, &key).unwrap();
    assert_eq!(cached, Some(hit));

    // scoped by platform
    assert!(db::get_resolution(&conn, Platform::Spotify, &key).unwrap().is_none());
}

#[test]
fn upsert_replaces_existing_resolution() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("nested").join("cache.db")).unwrap();
    let key = normalized_key("Stay", "Zedd").unwrap();

    db::upsert_resolution(&conn, Platform::YoutubeMusic, &key, &RawTrack::new("Stay", "Zedd").with_native_id("yt:old")).unwrap();
    db::upsert_resolution(&conn, Platform::YoutubeMusic, &key, &RawTrack::new("Stay", "Zedd").with_native_id("yt:new")).unwrap();

    let cached = db::get_resolution(&conn, Platform::YoutubeMusic, &key).unwrap().unwrap();
    assert_eq!(cached.native_id, "yt:new");
    assert_eq!(cached.album, None);
    assert_eq!(db::count_resolutions(&conn).unwrap(), 1);
}

#[test]
fn clear_only_touches_one_platform() {
    let td = tempdir().unwrap();
    let mut conn = db::open_or_create(&td.path().join("cache.db")).unwrap();
    let a = normalized_key("One", "A").unwrap();
    let b = normalized_key("Two", "B").unwrap();
    db::upsert_resolution(&conn, Platform::Spotify, &a, &RawTrack::new("One", "A").with_native_id("s1")).unwrap();
    db::upsert_resolution(&conn, Platform::Spotify, &b, &RawTrack::new("Two", "B").with_native_id("s2")).unwrap();
    db::upsert_resolution(&conn, Platform::AppleMusic, &a, &RawTrack::new("One", "A").with_native_id("a1")).unwrap();

    let removed = db::clear_resolutions(&mut conn, Platform::Spotify).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(db::count_resolutions(&conn).unwrap(), 1);
    assert!(db::get_resolution(&conn, Platform::AppleMusic, &a).unwrap().is_some());
}

#[test]
fn migrations_are_idempotent() {
    let td = tempdir().unwrap();
    let conn = Connection::open(td.path().join("m.db")).unwrap();
    db::run_migrations(&conn).expect("first run");
    db::run_migrations(&conn).expect("second run");
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='track_resolution'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(n, 1);
}

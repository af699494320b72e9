use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use music_stream_preview_client::config::Config;
use music_stream_preview_client::db;

#[test]
fn config_from_path_parses_toml_and_fills_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
client_id = "cid"
client_secret = "csecret"
db_path = "/tmp/test.db"
log_dir = "/tmp"
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.client_id, "cid");
    assert_eq!(cfg.db_path.to_str().unwrap(), "/tmp/test.db");
    assert_eq!(cfg.http_timeout_sec, 10);
    assert!((cfg.preview_volume - 0.05).abs() < f32::EPSILON);
    assert!(!cfg.scopes.is_empty());
    assert!(cfg.auth_base.is_none());
}

#[test]
fn config_missing_client_id_fails() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    f.write_all(b"client_secret = \"s\"\n").unwrap();
    assert!(Config::from_path(&cfg_path).is_err());
}

#[test]
fn run_migrations_creates_credentials_table() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).expect("run migrations");
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='credentials'")
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    let found = rows.next().unwrap().is_some();
    assert!(found, "credentials table should exist after migrations");
}

#[test]
fn open_or_create_builds_missing_parent_directories() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("nested/dirs/client.db");
    let conn = db::open_or_create(&db_path).expect("open");
    db::set_value(&conn, "probe", "1").expect("insert");
    assert!(db_path.exists());
}

#[test]
fn credential_round_trip() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("client.db")).unwrap();

    assert!(db::load_credential(&conn).unwrap().is_none());

    db::save_credential(&conn, "access", Some("refresh"), 1_700_000_000).unwrap();
    let cred = db::load_credential(&conn).unwrap().expect("credential");
    assert_eq!(cred.access_token, "access");
    assert_eq!(cred.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(cred.expires_at, Some(1_700_000_000));
}

#[test]
fn saving_without_refresh_token_preserves_the_previous_one() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("client.db")).unwrap();

    db::save_credential(&conn, "access-1", Some("refresh-1"), 100).unwrap();
    db::save_credential(&conn, "access-2", None, 200).unwrap();

    let cred = db::load_credential(&conn).unwrap().expect("credential");
    assert_eq!(cred.access_token, "access-2");
    assert_eq!(cred.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(cred.expires_at, Some(200));
}

#[test]
fn clear_credential_removes_every_row() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("client.db")).unwrap();

    db::save_credential(&conn, "access", Some("refresh"), 100).unwrap();
    db::clear_credential(&conn).unwrap();
    assert!(db::load_credential(&conn).unwrap().is_none());
    assert!(db::get_value(&conn, db::KEY_REFRESH_TOKEN).unwrap().is_none());
    assert!(db::get_value(&conn, db::KEY_EXPIRES_IN).unwrap().is_none());
}

#[test]
fn unparseable_expiry_is_treated_as_absent() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("client.db")).unwrap();

    db::set_value(&conn, db::KEY_ACCESS_TOKEN, "access").unwrap();
    db::set_value(&conn, db::KEY_EXPIRES_IN, "not-a-number").unwrap();
    let cred = db::load_credential(&conn).unwrap().expect("credential");
    assert_eq!(cred.expires_at, None);
}

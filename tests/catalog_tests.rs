use music_stream_preview_client as lib;

use lib::auth::{AuthConfig, TokenAuthority};
use lib::catalog::CatalogClient;
use lib::db;
use mockito::Server;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn signed_in_authority(db_path: PathBuf) -> Arc<TokenAuthority> {
    let conn = db::open_or_create(&db_path).expect("open db");
    db::save_credential(
        &conn,
        "catalog-token",
        Some("refresh"),
        chrono::Utc::now().timestamp() + 3600,
    )
    .expect("seed");
    Arc::new(TokenAuthority::new(AuthConfig {
        client_id: "test_id".into(),
        client_secret: "test_secret".into(),
        redirect_uri: "http://127.0.0.1:8888/callback".into(),
        scopes: vec!["user-read-private".into()],
        db_path,
        auth_base: Some("http://unused".into()),
        http_timeout: Duration::from_secs(10),
    }))
}

#[test]
fn search_sends_bearer_and_parses_tracks() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/search?q=daft%20punk&type=track&limit=2")
        .match_header("authorization", "Bearer catalog-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "tracks": {
                    "items": [
                        {
                            "id": "t1",
                            "name": "One More Time",
                            "artists": [{"name": "Daft Punk"}],
                            "album": {"name": "Discovery"},
                            "preview_url": "https://previews.example/t1.mp3",
                            "duration_ms": 30000
                        },
                        {
                            "id": "t2",
                            "name": "Aerodynamic",
                            "artists": [{"name": "Daft Punk"}],
                            "album": {"name": "Discovery"},
                            "preview_url": null
                        }
                    ]
                }
            })
            .to_string(),
        )
        .create();

    let dir = tempfile::tempdir().expect("tmpdir");
    let auth = signed_in_authority(dir.path().join("client.db"));
    let catalog = CatalogClient::new(auth, Some(base), Duration::from_secs(10));

    let rt = tokio::runtime::Runtime::new().expect("rt");
    let tracks = rt
        .block_on(catalog.search_tracks("daft punk", 2))
        .expect("search");
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].id, "t1");
    assert_eq!(tracks[0].artist, "Daft Punk");
    assert!(tracks[0].preview_url_parsed().is_some());
    assert!(tracks[1].preview_url_parsed().is_none());
}

#[test]
fn new_releases_reduces_to_id_name_pairs() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/browse/new-releases?limit=2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "albums": {
                    "items": [
                        {"id": "al1", "name": "Album One"},
                        {"id": "al2", "name": "Album Two"}
                    ]
                }
            })
            .to_string(),
        )
        .create();

    let dir = tempfile::tempdir().expect("tmpdir");
    let auth = signed_in_authority(dir.path().join("client.db"));
    let catalog = CatalogClient::new(auth, Some(base), Duration::from_secs(10));

    let rt = tokio::runtime::Runtime::new().expect("rt");
    let releases = rt.block_on(catalog.new_releases(2)).expect("releases");
    assert_eq!(
        releases,
        vec![
            ("al1".to_string(), "Album One".to_string()),
            ("al2".to_string(), "Album Two".to_string())
        ]
    );
}

#[test]
fn playlist_tracks_unwrap_the_track_envelope() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/playlists/pl1/tracks?limit=50")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {"track": {"id": "t1", "name": "Song", "artists": [{"name": "A"}]}},
                    // Local files come back with a null track id; skipped.
                    {"track": {"id": null, "name": "local"}}
                ]
            })
            .to_string(),
        )
        .create();

    let dir = tempfile::tempdir().expect("tmpdir");
    let auth = signed_in_authority(dir.path().join("client.db"));
    let catalog = CatalogClient::new(auth, Some(base), Duration::from_secs(10));

    let rt = tokio::runtime::Runtime::new().expect("rt");
    let tracks = rt.block_on(catalog.playlist_tracks("pl1")).expect("tracks");
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id, "t1");
}

#[test]
fn catalog_requires_a_signed_in_authority() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let auth = Arc::new(TokenAuthority::new(AuthConfig {
        client_id: "test_id".into(),
        client_secret: "test_secret".into(),
        redirect_uri: "http://127.0.0.1:8888/callback".into(),
        scopes: vec![],
        db_path: dir.path().join("client.db"),
        auth_base: Some("http://unused".into()),
        http_timeout: Duration::from_secs(10),
    }));
    let catalog = CatalogClient::new(auth, Some("http://unused".into()), Duration::from_secs(10));

    let rt = tokio::runtime::Runtime::new().expect("rt");
    let err = rt
        .block_on(catalog.current_user_profile())
        .expect_err("must fail signed out");
    assert!(err.to_string().contains("not signed in"));
}

#[test]
fn http_error_surfaces_status_and_body() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/me")
        .with_status(403)
        .with_body(json!({"error": "forbidden"}).to_string())
        .create();

    let dir = tempfile::tempdir().expect("tmpdir");
    let auth = signed_in_authority(dir.path().join("client.db"));
    let catalog = CatalogClient::new(auth, Some(base), Duration::from_secs(10));

    let rt = tokio::runtime::Runtime::new().expect("rt");
    let err = rt
        .block_on(catalog.current_user_profile())
        .expect_err("must fail");
    assert!(err.to_string().contains("403"));
}

//! End-to-end CLI tests for the trackgrab binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary command isolated from any user config file.
fn trackgrab(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trackgrab").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

async fn mock_endpoint(audio_body: &[u8]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "title": "Song",
            "artist": "Band",
            "duration": 125,
            "size": 1536,
            "download_url": format!("{}/audio/song.mp3", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/song.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio_body.to_vec()))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_binary_without_input_returns_zero() {
    let home = TempDir::new().unwrap();
    trackgrab(&home).write_stdin("").assert().success();
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    trackgrab(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve music-track links"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    trackgrab(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("trackgrab"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    trackgrab(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_rejects_non_track_link() {
    let home = TempDir::new().unwrap();
    trackgrab(&home)
        .args(["--api", "http://127.0.0.1:9/api"])
        .arg("https://open.spotify.com/album/xyz")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Only Spotify track URLs are supported at the moment",
        ));
}

#[test]
fn test_binary_rejects_bad_config_file() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("trackgrab");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "unknown_key = 1\n").unwrap();

    trackgrab(&home)
        .arg("https://open.spotify.com/track/abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_binary_info_json_prints_track() {
    let home = TempDir::new().unwrap();
    let server = tokio_test::block_on(mock_endpoint(b"audio"));

    trackgrab(&home)
        .args(["--api", &format!("{}/api", server.uri()), "--info", "--json"])
        .arg("https://open.spotify.com/track/abc")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"duration\": \"2:05\""))
        .stdout(predicate::str::contains("\"size\": \"1.5 KB\""));
}

#[test]
fn test_binary_downloads_to_output_dir() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let server = tokio_test::block_on(mock_endpoint(b"ID3-audio"));

    trackgrab(&home)
        .args(["--api", &format!("{}/api", server.uri())])
        .arg("-o")
        .arg(out.path())
        .write_stdin("https://open.spotify.com/track/abc\n")
        .assert()
        .success();

    let saved = out.path().join("Band - Song.mp3");
    assert_eq!(std::fs::read(saved).unwrap(), b"ID3-audio");
}

#[test]
fn test_binary_shell_host_writes_under_download_folder() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let server = tokio_test::block_on(mock_endpoint(b"ID3-shell"));

    trackgrab(&home)
        .args(["--api", &format!("{}/api", server.uri()), "--host", "shell"])
        .arg("--storage-root")
        .arg(root.path())
        .arg("https://app.example/#https%3A%2F%2Fopen.spotify.com%2Ftrack%2Fabc")
        .assert()
        .success()
        .stderr(predicate::str::contains("URL loaded from link!"));

    let saved = root.path().join("Download").join("Band - Song.mp3");
    assert_eq!(std::fs::read(saved).unwrap(), b"ID3-shell");
}

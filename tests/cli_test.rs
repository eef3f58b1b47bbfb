//! Command-line smoke tests for the `wejay` binary
//!
//! Each test runs the built binary against a temporary config path (absent,
//! so defaults apply) and a temporary JSON document store.

mod common;

use std::path::Path;
use std::sync::Arc;

use assert_cmd::Command;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wejay::backend::JsonFileDocumentStore;
use wejay::spotify::auth::{CredentialStore, DocumentCredentialStore, TokenCredential};

use common::{profile_body, temp_config_file, token_body};

fn wejay(dir: &TempDir) -> Command {
    wejay_with_config(&dir.path().join("absent.yaml"))
}

fn wejay_with_config(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wejay").expect("binary built");
    cmd.arg("--config")
        .arg(config)
        .env_remove("WEJAY_USER")
        .env_remove("WEJAY_USER_ID")
        .env_remove("WEJAY_STORE_BACKEND")
        .env_remove("WEJAY_STORE_PATH")
        .env_remove("WEJAY_SPOTIFY_ACCOUNTS_BASE")
        .env_remove("WEJAY_SPOTIFY_API_BASE")
        .env("NO_COLOR", "1");
    cmd
}

fn file_store(path: &Path) -> DocumentCredentialStore {
    DocumentCredentialStore::new(Arc::new(JsonFileDocumentStore::new(path)))
}

fn seed(path: &Path, expires_in: i64) {
    let credential = TokenCredential {
        provider_user_id: "wizzler".to_string(),
        display_name: Some("Maya Ody-Ajike".to_string()),
        email: Some("maya@example.com".to_string()),
        profile_photo_url: None,
        access_token: "old-access".to_string(),
        refresh_token: Some("R".to_string()),
        scope: "user-read-private".to_string(),
        expires_at: Utc::now() + Duration::seconds(expires_in),
        is_connected: true,
    };
    tokio_test::block_on(file_store(path).save("u1", &credential)).unwrap();
}

fn stored(path: &Path) -> TokenCredential {
    tokio_test::block_on(file_store(path).load("u1"))
        .unwrap()
        .expect("record present")
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    wejay(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("disconnect"));
}

#[test]
fn test_status_json_for_fresh_memory_store() {
    let dir = TempDir::new().unwrap();
    wejay(&dir)
        .args(["--store", "memory", "--user", "u1", "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"disconnected\""));
}

#[test]
fn test_status_uses_config_file_identity() {
    let (_config_dir, config_path) =
        temp_config_file("store:\n  backend: memory\nidentity:\n  user_id: from-file\n");
    wejay_with_config(&config_path)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user_id\": \"from-file\""));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_config_dir, config_path) = temp_config_file("spotify:\n  timeout_seconds: 0\n");
    wejay_with_config(&config_path)
        .args(["--store", "memory", "--user", "u1", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_seconds"));
}

#[test]
fn test_status_without_user_fails() {
    let dir = TempDir::new().unwrap();
    wejay(&dir)
        .args(["--store", "memory", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No signed-in user"));
}

#[test]
fn test_status_reads_file_store() {
    let dir = TempDir::new().unwrap();
    let users = dir.path().join("users.json");
    seed(&users, 3600);

    wejay(&dir)
        .env("WEJAY_STORE_PATH", &users)
        .args(["--store", "file", "--user", "u1", "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"connected\""))
        .stdout(predicate::str::contains("\"spotify_user_id\": \"wizzler\""))
        .stdout(predicate::str::contains("old-access").not());
}

#[test]
fn test_disconnect_marks_file_record() {
    let dir = TempDir::new().unwrap();
    let users = dir.path().join("users.json");
    seed(&users, 3600);

    wejay(&dir)
        .env("WEJAY_STORE_PATH", &users)
        .args(["--store", "file", "--user", "u1", "disconnect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disconnected"));

    let record = stored(&users);
    assert!(!record.is_connected);
    assert!(record.refresh_token.is_none());
}

#[test]
fn test_disconnect_forget_removes_file_record() {
    let dir = TempDir::new().unwrap();
    let users = dir.path().join("users.json");
    seed(&users, 3600);

    wejay(&dir)
        .env("WEJAY_STORE_PATH", &users)
        .args(["--store", "file", "--user", "u1", "disconnect", "--forget"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed Spotify account record"));

    let remaining = tokio_test::block_on(file_store(&users).load("u1")).unwrap();
    assert!(remaining.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_expired_file_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let users = dir.path().join("users.json");
    let uri = server.uri();

    let seeded = users.clone();
    let (record, _dir) = tokio::task::spawn_blocking(move || {
        seed(&seeded, -60);
        wejay(&dir)
            .env("WEJAY_STORE_PATH", &seeded)
            .env("WEJAY_SPOTIFY_ACCOUNTS_BASE", &uri)
            .args(["--store", "file", "--user", "u1", "refresh"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Access token refreshed"));
        let record = stored(&seeded);
        (record, dir)
    })
    .await
    .unwrap();

    assert_eq!(record.access_token, "A2");
    assert_eq!(record.refresh_token.as_deref(), Some("R"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_with_pasted_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("code=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A", Some("R"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        wejay(&dir)
            .env("WEJAY_SPOTIFY_ACCOUNTS_BASE", &uri)
            .env("WEJAY_SPOTIFY_API_BASE", &uri)
            .args(["--store", "memory", "--user", "u1", "connect", "--no-browser"])
            .write_stdin("wejay://callback?code=abc123\n")
            .assert()
            .success()
            .stderr(predicate::str::contains("code_challenge_method=S256"))
            .stdout(predicate::str::contains(
                "Connected Spotify account Maya (wizzler)",
            ));
    })
    .await
    .unwrap();
}

#[test]
fn test_connect_denied_by_user() {
    let dir = TempDir::new().unwrap();
    wejay(&dir)
        .args(["--store", "memory", "--user", "u1", "connect", "--no-browser"])
        .write_stdin("wejay://callback?error=access_denied\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authorization denied: access_denied"));
}

#[test]
fn test_connect_closed_stdin_is_cancelled() {
    let dir = TempDir::new().unwrap();
    wejay(&dir)
        .args(["--store", "memory", "--user", "u1", "connect", "--no-browser"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authorization cancelled"));
}

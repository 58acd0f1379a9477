//! End-to-end tests for the `threads` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn threads(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("threads");
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env_remove("THREADS_EMAIL")
        .env_remove("THREADS_PASSWORD")
        .env_remove("THREADS__API__BASE_URL")
        .env("NO_COLOR", "1");
    cmd
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "csrftoken=tok1; Path=/")
                .append_header("set-cookie", "sessionid=abc; Path=/"),
        )
        .mount(server)
        .await;
}

#[test]
fn missing_credentials_prints_usage_and_fails() {
    let home = TempDir::new().unwrap();
    threads(&home)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("email and password are required"))
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn extra_arguments_are_a_usage_error() {
    let home = TempDir::new().unwrap();
    threads(&home)
        .args(["a@example.com", "pw", "surplus"])
        .assert()
        .code(1);
}

#[test]
fn local_commands_do_not_need_credentials() {
    let home = TempDir::new().unwrap();
    threads(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    threads(&home)
        .args(["config", "schema"])
        .assert()
        .success()
        .stdout(predicate::str::contains("threads configuration"));
}

#[tokio::test]
async fn rejected_login_exits_with_status_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/login/"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    threads(&home)
        .env("THREADS__API__BASE_URL", format!("{}/v1", server.uri()))
        .args(["ana@example.com", "wrong"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Failed to login. Check your credentials and try again.",
        ));
}

#[tokio::test]
async fn default_command_lists_threads() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "Design review"},
            {"id": 4}
        ])))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    threads(&home)
        .env("THREADS__API__BASE_URL", format!("{}/v1", server.uri()))
        .args(["ana@example.com", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Design review"))
        .stdout(predicate::str::contains("(unnamed)"));
}

#[tokio::test]
async fn post_sends_csrf_header_and_prints_json() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/"))
        .and(header("x-csrftoken", "tok1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/42/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "thread": 42, "text": threads_core::format_message("hi").unwrap()}
        ])))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let output = threads(&home)
        .env("THREADS__API__BASE_URL", format!("{}/v1", server.uri()))
        .args(["--json", "ana@example.com", "hunter2", "post", "42", "hi"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let messages: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(messages[0]["thread"], 42);
}

#[tokio::test]
async fn upload_with_empty_response_body_succeeds() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/references/"))
        .and(header("x-csrftoken", "tok1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    let file = home.path().join("f.bin");
    std::fs::write(&file, b"abc").unwrap();

    threads(&home)
        .env("THREADS__API__BASE_URL", format!("{}/v1", server.uri()))
        .args(["ana@example.com", "hunter2", "reference", "upload", "42", "f"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploaded reference to thread 42."));
}

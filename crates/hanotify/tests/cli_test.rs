//! Integration tests for the `hanotify` binary.
//!
//! Every test points `--config` at a temp file, so nothing touches the
//! user's real configuration and no live hub is needed.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the binary with env isolation.
fn hanotify_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hanotify");
    cmd.env("HOME", "/tmp/hanotify-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/hanotify-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("HANOTIFY_PROFILE")
        .env_remove("HANOTIFY_CONFIG")
        .env_remove("HANOTIFY_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

const CONFIG: &str = r#"
default_profile = "home"

[defaults]
fallback_title = "House"

[profiles.home]
lan_url = "http://homeassistant.local:8123"
wan_url = "https://ha.example.net"
token = "plain-token"

[profiles.empty]

[[templates]]
id = 7
name = "alarm"
priority = "critical"
popup = true
persistent = true
"#;

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, config).unwrap();
        Self { dir, config: path }
    }

    fn payload(&self, value: &Value) -> PathBuf {
        let path = self.dir.path().join("payload.json");
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = hanotify_cmd();
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

fn render_json(fixture: &Fixture, payload: &Path) -> Value {
    let output = fixture
        .cmd()
        .args(["--output", "json", "render"])
        .arg(payload)
        .output()
        .unwrap();
    assert!(output.status.success(), "render failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = hanotify_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "expected usage text:\n{text}");
}

#[test]
fn help_lists_commands() {
    hanotify_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("resolve"))
            .and(predicate::str::contains("render"))
            .and(predicate::str::contains("action")),
    );
}

#[test]
fn completions_zsh() {
    hanotify_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn completions_bash() {
    hanotify_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_honours_flag() {
    let fx = Fixture::new(CONFIG);
    fx.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(fx.config.display().to_string()));
}

#[test]
fn config_show_redacts_tokens() {
    let fx = Fixture::new(CONFIG);
    fx.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("homeassistant.local")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("plain-token").not()),
        );
}

#[test]
fn config_show_without_file_uses_defaults() {
    let fx = Fixture::new(CONFIG);
    hanotify_cmd()
        .arg("--config")
        .arg(fx.dir.path().join("absent.toml"))
        .args(["config", "show"])
        .assert()
        .success();
}

// ── Resolve ─────────────────────────────────────────────────────────

#[test]
fn resolve_prefers_lan() {
    let fx = Fixture::new(CONFIG);
    fx.cmd()
        .args(["--output", "plain", "resolve"])
        .assert()
        .success()
        .stdout("ws://homeassistant.local:8123/api/websocket\n");
}

#[test]
fn resolve_on_cellular_uses_wan() {
    let fx = Fixture::new(CONFIG);
    fx.cmd()
        .args(["--output", "plain", "resolve", "--network", "cellular"])
        .assert()
        .success()
        .stdout("wss://ha.example.net/api/websocket\n");
}

#[test]
fn resolve_without_addresses_prints_none() {
    let fx = Fixture::new(CONFIG);
    fx.cmd()
        .args(["--profile", "empty", "resolve"])
        .assert()
        .success()
        .stdout("none\n");
}

#[test]
fn resolve_json_names_the_source() {
    let fx = Fixture::new(CONFIG);
    let output = fx
        .cmd()
        .args(["--output", "json", "resolve"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["profile"], "home");
    assert_eq!(value["source"], "lan");
}

#[test]
fn unknown_profile_exits_not_found() {
    let fx = Fixture::new(CONFIG);
    let output = fx.cmd().args(["--profile", "cabin", "resolve"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cabin"));
}

// ── Render ──────────────────────────────────────────────────────────

#[test]
fn render_critical_popup() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!({
        "title": "Leak",
        "body": "Water in the **basement**, see https://ha.example.net/cam",
        "bodyFormat": "markdown",
        "priority": "critical",
        "popup": true,
        "collapseKey": "leak",
        "actions": [
            {"type": "url", "title": "Camera", "url": "https://ha.example.net/cam"},
            {"type": "ha_service", "title": "Valve", "targetData": {"service": "valve.close"}}
        ]
    }));

    let value = render_json(&fx, &payload);
    assert_eq!(value["title"], "Leak");
    assert_eq!(value["channel"], "critical");
    assert_eq!(value["tier"], "max");
    assert_eq!(value["category"], "alarm");
    assert_eq!(value["full_screen"], true);
    assert_eq!(value["actions"][0]["icon"], "view");
    assert_eq!(value["actions"][1]["icon"], "play");
    assert_eq!(value["actions"][1]["index"], 1);
    assert!(
        value["summary"]
            .as_str()
            .unwrap()
            .starts_with("Water in the basement")
    );
}

#[test]
fn render_applies_fallback_title_and_template() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!({"body": "Smoke", "templateName": "ALARM"}));

    let value = render_json(&fx, &payload);
    assert_eq!(value["title"], "House");
    assert_eq!(value["priority"], "critical");
    assert_eq!(value["ongoing"], true);
    assert_eq!(value["auto_cancel"], false);
    assert_eq!(value["full_screen"], true);
}

#[test]
fn render_plain_is_one_line() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!({"title": "Door", "body": "Front door open"}));
    fx.cmd()
        .args(["--output", "plain", "render"])
        .arg(&payload)
        .assert()
        .success()
        .stdout(predicate::str::contains("\tinfo\tDoor\tFront door open"));
}

#[test]
fn render_rejects_non_object_payload() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!(["not", "an", "object"]));
    let output = fx.cmd().arg("render").arg(&payload).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Action ──────────────────────────────────────────────────────────

#[test]
fn action_index_out_of_range() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!({"title": "Door"}));
    let output = fx
        .cmd()
        .args(["action", "--index", "0"])
        .arg(&payload)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn action_with_unknown_type_fails() {
    let fx = Fixture::new(CONFIG);
    let payload = fx.payload(&json!({
        "title": "Door",
        "actions": [{"type": "intent", "title": "Do it"}]
    }));
    fx.cmd()
        .args(["--output", "plain", "action", "--index", "0"])
        .arg(&payload)
        .assert()
        .failure()
        .stdout("failed\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn action_calls_hub_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_on"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"entity_id": "light.porch"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let fx = Fixture::new(&format!(
        "default_profile = \"hub\"\n\n[profiles.hub]\nlan_url = \"{}\"\ntoken = \"test-token\"\n",
        server.uri()
    ));
    let payload = fx.payload(&json!({
        "title": "Porch",
        "actions": [{
            "type": "ha_service",
            "title": "Lights on",
            "targetData": {"service": "light.turn_on", "data": {"entity_id": "light.porch"}}
        }]
    }));

    let output = tokio::task::spawn_blocking(move || {
        fx.cmd()
            .args(["--output", "json", "action", "--index", "0"])
            .arg(&payload)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "action failed: {output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["title"], "Lights on");
}

#[tokio::test(flavor = "multi_thread")]
async fn action_reports_hub_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/script/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let fx = Fixture::new(&format!(
        "default_profile = \"hub\"\n\n[profiles.hub]\nlan_url = \"{}\"\ntoken = \"test-token\"\n",
        server.uri()
    ));
    let payload = fx.payload(&json!({
        "actions": [{"type": "ha_service", "title": "Run", "service": "script.run"}]
    }));

    let output = tokio::task::spawn_blocking(move || {
        fx.cmd()
            .args(["action", "-i", "0"])
            .arg(&payload)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("500"));
}

#[test]
fn service_action_without_token_is_auth_error() {
    let fx = Fixture::new("[profiles.default]\nlan_url = \"http://127.0.0.1:9\"\n");
    let payload = fx.payload(&json!({
        "actions": [{"type": "ha_service", "title": "Run", "service": "script.run"}]
    }));
    let output = fx
        .cmd()
        .args(["--profile", "default", "action", "-i", "0"])
        .arg(&payload)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

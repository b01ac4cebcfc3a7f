//! Dispatcher tests that run commands in-process.
//!
//! These use scripted interaction and in-memory output, so prompts and
//! confirmation can be exercised without a terminal.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctl::cli::{commands, execute};
use doctl::engine::Io;
use doctl::ui::prompts::ScriptedInteraction;

// =============================================================================
// Test Fixtures
// =============================================================================

/// A cloneable in-memory writer.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Run {
    code: u8,
    out: String,
    err: String,
}

struct Harness {
    dir: TempDir,
    env: HashMap<String, String>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            env: HashMap::new(),
        }
    }

    async fn run(&self, args: &[&str], interaction: ScriptedInteraction) -> Run {
        let registry = commands::registry().expect("command tree should build");
        let config = self.dir.path().join("config.yaml");
        let mut argv = vec![
            "doctl".to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));

        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let io = Io {
            out: Box::new(out.clone()),
            err: Box::new(err.clone()),
            interaction: Box::new(interaction),
        };
        let code = execute(&registry, argv, &self.env, io, CancellationToken::new()).await;
        Run {
            code,
            out: out.contents(),
            err: err.contents(),
        }
    }
}

fn app_body() -> serde_json::Value {
    json!({
        "app": {
            "id": "f4c2a1",
            "spec": {"name": "sample-app", "services": [{"name": "web"}]},
            "default_ingress": "https://sample-app.ondigitalocean.app",
            "active_deployment": {"id": "dep-1"},
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-02T11:30:00Z"
        }
    })
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn destructive_command_confirms_interactively() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/apps/f4c2a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "token", "-u", &server.uri(), "apps", "delete", "f4c2a1"],
            ScriptedInteraction::new(["y"]),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    assert_eq!(run.out, "Notice: App deleted\n");
}

#[tokio::test]
async fn declined_confirmation_aborts_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "token", "-u", &server.uri(), "apps", "delete", "f4c2a1"],
            ScriptedInteraction::new(["n"]),
        )
        .await;

    assert_eq!(run.code, 1);
    assert_eq!(run.err, "Error: operation aborted\n");
}

#[tokio::test]
async fn non_interactive_without_force_aborts() {
    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "token", "apps", "delete", "f4c2a1"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 1);
    assert_eq!(run.err, "Error: operation aborted\n");
}

#[tokio::test]
async fn interactive_flag_overrides_detection() {
    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "token", "--interactive=false", "apps", "delete", "f4c2a1"],
            ScriptedInteraction::new(["y"]),
        )
        .await;

    assert_eq!(run.code, 1);
    assert_eq!(run.err, "Error: operation aborted\n");
}

// =============================================================================
// Arguments
// =============================================================================

#[tokio::test]
async fn too_many_arguments() {
    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "token", "apps", "get", "a", "b"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 1);
    assert_eq!(run.err, "Error: (apps.get) command contains too many arguments\n");
}

#[tokio::test]
async fn group_without_subcommand_prints_help() {
    let harness = Harness::new();
    let run = harness
        .run(&["compute"], ScriptedInteraction::non_interactive())
        .await;

    assert_eq!(run.code, 0);
    assert!(run.out.contains("action"));
}

#[tokio::test]
async fn env_token_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/f4c2a1"))
        .and(wiremock::matchers::header("authorization", "Bearer env-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut harness = Harness::new();
    harness
        .env
        .insert("DIGITALOCEAN_ACCESS_TOKEN".into(), "env-token".into());
    let run = harness
        .run(
            &["-u", &server.uri(), "apps", "get", "f4c2a1", "--format", "ID,Spec.Name"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    assert_eq!(run.out, "ID        Spec Name\nf4c2a1    sample-app\n");
}

// =============================================================================
// Output
// =============================================================================

#[tokio::test]
async fn unknown_column_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/f4c2a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_body()))
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "t", "-u", &server.uri(), "apps", "get", "f4c2a1", "--format", "Nope"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 1);
    assert!(run.err.starts_with("Error: "), "stderr: {}", run.err);
    assert!(run.err.contains("Nope"));
}

#[tokio::test]
async fn template_sees_raw_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/f4c2a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_body()))
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &[
                "-t",
                "t",
                "-u",
                &server.uri(),
                "apps",
                "get",
                "f4c2a1",
                "--template",
                "{{.Spec.Name}}:{{range .Spec.Services}}{{.Name}}{{end}}",
            ],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    assert_eq!(run.out, "sample-app:web\n");
}

#[tokio::test]
async fn json_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/f4c2a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_body()))
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "t", "-u", &server.uri(), "-o", "json", "apps", "get", "f4c2a1"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    let value: serde_json::Value = serde_json::from_str(&run.out).unwrap();
    assert_eq!(value[0]["id"], "f4c2a1");
    assert_eq!(value[0]["spec"]["name"], "sample-app");
}

#[tokio::test]
async fn list_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(wiremock::matchers::query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apps": [{"id": "one", "spec": {"name": "first"}}],
            "links": {"pages": {"next": "https://api.example/v2/apps?page=2"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/apps"))
        .and(wiremock::matchers::query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apps": [{"id": "two", "spec": {"name": "second"}}],
            "links": {}
        })))
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-t", "t", "-u", &server.uri(), "apps", "ls", "--format", "ID", "--no-header"],
            ScriptedInteraction::non_interactive(),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    assert_eq!(run.out, "one\ntwo\n");
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn auth_init_prompts_for_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": {"email": "sammy@digitalocean.com", "droplet_limit": 25}
        })))
        .mount(&server)
        .await;

    let harness = Harness::new();
    let run = harness
        .run(
            &["-u", &server.uri(), "auth", "init"],
            ScriptedInteraction::new(["  scripted-token  "]),
        )
        .await;

    assert_eq!(run.code, 0, "stderr: {}", run.err);
    assert!(run.err.contains("Validating token... OK"));
    let saved = std::fs::read_to_string(harness.dir.path().join("config.yaml")).unwrap();
    assert_eq!(saved, "access-token: scripted-token\n");
}

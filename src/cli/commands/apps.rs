//! apps commands - Manage App Platform applications

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::api::resources::{App, AppLogs, LogType};
use crate::api::Request;
use crate::cli::dispatch::UsageError;
use crate::cli::registry::{ArgCount, CommandSpec, Handler};
use crate::core::config::SettingSpec;
use crate::engine::stream::stream_logs;
use crate::engine::Invocation;

pub fn command() -> CommandSpec {
    CommandSpec::group("apps", "Display commands for working with apps")
        .alias("app")
        .alias("a")
        .long_about("The subcommands of `doctl apps` manage your App Platform apps.")
        .child(
            CommandSpec::leaf("list", "List all apps", List)
                .alias("ls")
                .long_about(
                    "Lists all apps associated with your account, including their ID, spec \
                     name, and active deployment ID.",
                ),
        )
        .child(
            CommandSpec::leaf("get", "Get an app", Get)
                .alias("g")
                .args(ArgCount::exactly(1), "<app id>"),
        )
        .child(
            CommandSpec::leaf("delete", "Deletes an app", Delete)
                .alias("d")
                .alias("rm")
                .args(ArgCount::exactly(1), "<app id>")
                .destructive("delete this app"),
        )
        .child(
            CommandSpec::leaf("logs", "Get logs", Logs)
                .alias("l")
                .long_about(
                    "Retrieves component logs for a deployment of an app. Without \
                     `--deployment`, the active deployment is used. Without a component \
                     name, logs of every component are shown.\n\n\
                     `--follow` streams live logs until interrupted.",
                )
                .args(ArgCount::between(1, 2), "<app id> [component name]")
                .flag(
                    SettingSpec::string("deployment")
                        .help("The deployment ID. Defaults to current deployment."),
                )
                .flag(
                    SettingSpec::string("type")
                        .help("The type of logs to retrieve: build, deploy, or run")
                        .default_str("run"),
                )
                .flag(
                    SettingSpec::bool("follow")
                        .short('f')
                        .help("Return logs as they are generated")
                        .default_bool(false),
                )
                .flag(
                    SettingSpec::int("tail")
                        .help("Number of lines to show from the end of the log")
                        .default_int(-1),
                ),
        )
}

fn app_path(id: &str) -> String {
    format!("/v2/apps/{}", id)
}

fn logs_request(
    app: &str,
    deployment: &str,
    component: Option<&str>,
    kind: LogType,
    follow: bool,
    tail: i64,
) -> Request {
    let path = match component {
        Some(component) => format!(
            "{}/deployments/{}/components/{}/logs",
            app_path(app),
            deployment,
            component
        ),
        None => format!("{}/deployments/{}/logs", app_path(app), deployment),
    };
    let mut req = Request::get(path)
        .query("type", kind.as_query())
        .query("follow", follow);
    if tail >= 0 {
        req = req.query("tail_lines", tail);
    }
    req
}

struct List;

#[async_trait]
impl Handler for List {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let client = inv.client()?;
        let apps: Vec<App> = client.list_all(Request::get("/v2/apps"), "apps").await?;
        inv.display(&apps)
    }
}

struct Get;

#[async_trait]
impl Handler for Get {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let path = app_path(inv.arg(0).unwrap_or_default());
        let client = inv.client()?;
        let app: App = client.get(&path, "app").await?;
        inv.display_one(&app)
    }
}

struct Delete;

#[async_trait]
impl Handler for Delete {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let path = app_path(inv.arg(0).unwrap_or_default());
        let client = inv.client()?;
        client.send(&Request::delete(path)).await?;
        inv.notice("App deleted")
    }
}

struct Logs;

#[async_trait]
impl Handler for Logs {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let app_id = inv.arg(0).unwrap_or_default().to_string();
        let component = inv.arg(1).map(str::to_string);
        let kind: LogType = inv
            .settings
            .string("type")
            .unwrap_or_else(|| "run".to_string())
            .parse::<LogType>()
            .map_err(|message| UsageError::InvalidFlag {
                flag: "type".to_string(),
                message,
            })?;
        let follow = inv.settings.flag("follow");
        let tail = inv.settings.int("tail").unwrap_or(-1);
        let deployment = inv.settings.string("deployment").filter(|d| !d.is_empty());

        let client = inv.client()?;
        let cancel = inv.cancel.clone();

        let deployment = match deployment {
            Some(id) => id,
            None => {
                let app: App = client.get(&app_path(&app_id), "app").await?;
                app.active_deployment
                    .map(|d| d.id)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| anyhow!("app {} has no active deployment", app_id))?
            }
        };

        let req = logs_request(&app_id, &deployment, component.as_deref(), kind, follow, tail);
        let response = client.send(&req).await?;
        let logs: AppLogs = match response.body {
            Some(body) => serde_json::from_value(body).map_err(|e| client.decode_error(&req, e))?,
            None => AppLogs::default(),
        };

        let urls = logs.urls(follow);
        if urls.is_empty() {
            bail!("no logs found for app {}", app_id);
        }
        for url in urls {
            if cancel.is_cancelled() {
                break;
            }
            let copied = stream_logs(&client, &url, &mut *inv.out, &cancel).await?;
            tracing::debug!(bytes = copied, "log stream finished");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_request_for_component() {
        let req = logs_request("app-1", "dep-2", Some("web"), LogType::Build, false, 100);
        assert_eq!(req.path, "/v2/apps/app-1/deployments/dep-2/components/web/logs");
        assert_eq!(
            req.query,
            vec![
                ("type".to_string(), "BUILD".to_string()),
                ("follow".to_string(), "false".to_string()),
                ("tail_lines".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn logs_request_for_all_components() {
        let req = logs_request("app-1", "dep-2", None, LogType::Run, true, -1);
        assert_eq!(req.path, "/v2/apps/app-1/deployments/dep-2/logs");
        assert_eq!(req.query.len(), 2);
    }
}

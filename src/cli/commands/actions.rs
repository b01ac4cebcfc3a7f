//! compute action commands - Inspect and wait on actions

use anyhow::{Context as _, Result};
use async_trait::async_trait;

use crate::api::resources::Action;
use crate::api::Request;
use crate::cli::dispatch::UsageError;
use crate::cli::registry::{ArgCount, CommandSpec, Handler};
use crate::core::config::SettingSpec;
use crate::engine::poll::{self, ActionRef, PollConfig};
use crate::engine::Invocation;

const POLL_TIMEOUT: &str = "poll-timeout";

pub fn command() -> CommandSpec {
    CommandSpec::group("action", "Display commands for retrieving resource action history")
        .long_about(
            "The sub-commands of `doctl compute action` retrieve the history of actions \
             taken on your resources.\n\nYou can retrieve information for a specific action \
             by adding the action's ID as an argument, or list all actions with \
             `doctl compute action list`.",
        )
        .child(
            CommandSpec::leaf("get", "Retrieve details about a specific action", Get)
                .alias("g")
                .args(ArgCount::exactly(1), "<action-id>"),
        )
        .child(
            CommandSpec::leaf(
                "list",
                "Retrieve a list of all recent actions taken on your resources",
                List,
            )
            .alias("ls")
            .flag(
                SettingSpec::string("resource-type")
                    .help("Only include actions on this resource type"),
            )
            .flag(SettingSpec::string("region").help("Only include actions in this region"))
            .flag(SettingSpec::string("status").help("Only include actions with this status"))
            .flag(SettingSpec::string("action-type").help("Only include actions of this type")),
        )
        .child(
            CommandSpec::leaf("wait", "Block thread until an action completes", Wait)
                .long_about(
                    "Blocks until the action reaches `completed` or `errored`, checking its \
                     status at an interval of max(5s, poll-timeout/60). Fails once \
                     `--poll-timeout` minutes have elapsed.",
                )
                .args(ArgCount::exactly(1), "<action-id>")
                .flag(
                    SettingSpec::int(POLL_TIMEOUT)
                        .help("Re-poll time in minutes")
                        .default_int(poll::DEFAULT_TIMEOUT_MINUTES),
                ),
        )
}

fn action_id(raw: Option<&str>) -> Result<u64> {
    let raw = raw.unwrap_or_default();
    raw.parse::<u64>()
        .with_context(|| format!("invalid action id {:?}", raw))
}

struct Get;

#[async_trait]
impl Handler for Get {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let id = action_id(inv.arg(0))?;
        let client = inv.client()?;
        let action: Action = client.get(&ActionRef::Global(id).path(), "action").await?;
        inv.display_one(&action)
    }
}

struct List;

#[async_trait]
impl Handler for List {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let client = inv.client()?;
        let actions: Vec<Action> = client.list_all(Request::get("/v2/actions"), "actions").await?;

        let filter = |name: &str| inv.settings.string(name).filter(|s| !s.is_empty());
        let resource_type = filter("resource-type");
        let region = filter("region");
        let status = filter("status");
        let kind = filter("action-type");

        let actions: Vec<Action> = actions
            .into_iter()
            .filter(|a| resource_type.as_ref().map_or(true, |t| &a.resource_type == t))
            .filter(|a| region.as_ref().map_or(true, |r| &a.region_name() == r))
            .filter(|a| status.as_ref().map_or(true, |s| &a.status.to_string() == s))
            .filter(|a| kind.as_ref().map_or(true, |k| &a.kind == k))
            .collect();
        inv.display(&actions)
    }
}

struct Wait;

#[async_trait]
impl Handler for Wait {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let id = action_id(inv.arg(0))?;
        let minutes = inv
            .settings
            .int(POLL_TIMEOUT)
            .unwrap_or(poll::DEFAULT_TIMEOUT_MINUTES);
        let minutes = u64::try_from(minutes)
            .ok()
            .filter(|m| *m >= 1)
            .ok_or_else(|| UsageError::InvalidFlag {
                flag: POLL_TIMEOUT.to_string(),
                message: format!("must be at least 1 minute, got {}", minutes),
            })?;

        let client = inv.client()?;
        let cancel = inv.cancel.clone();
        let action = poll::wait_for_action(
            &client,
            ActionRef::Global(id),
            PollConfig::from_minutes(minutes),
            cancel,
        )
        .await?;
        inv.display_one(&action)
    }
}

//! api::resources
//!
//! Response types for the resources the built-in commands handle.
//!
//! Each type keeps unrecognised fields in `extra`, so templates and JSON
//! output see the full server response.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::RateLimit;
use crate::ui::format;
use crate::ui::output::{Column, Tabular};

/// The authenticated user's account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub droplet_limit: i64,
    #[serde(default)]
    pub floating_ip_limit: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tabular for Account {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("Email", "Email", |a| a.email.clone()),
            Column::new("DropletLimit", "Droplet Limit", |a| a.droplet_limit.to_string()),
            Column::new("EmailVerified", "Email Verified", |a| a.email_verified.to_string()),
            Column::new("UUID", "UUID", |a| a.uuid.clone()),
            Column::new("Status", "Status", |a| a.status.clone()),
        ]
    }
}

/// Rate-limit state as shown by `account ratelimit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<DateTime<Utc>>,
}

impl From<&RateLimit> for RateLimitInfo {
    fn from(rate: &RateLimit) -> Self {
        Self {
            limit: rate.limit,
            remaining: rate.remaining,
            reset: rate.reset_at,
        }
    }
}

impl Tabular for RateLimitInfo {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("Limit", "Limit", |r| opt_num(r.limit)),
            Column::new("Remaining", "Remaining", |r| opt_num(r.remaining)),
            Column::new("Reset", "Reset", |r| format::opt_time(r.reset.as_ref())),
        ]
    }
}

fn opt_num(n: Option<u64>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

/// Lifecycle state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    InProgress,
    Completed,
    Errored,
    #[serde(other)]
    Unknown,
}

impl ActionStatus {
    /// Terminal states never change once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Errored)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionStatus::InProgress => "in-progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Errored => "errored",
            ActionStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A region reference embedded in other resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionRef {
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A long-running operation on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: u64,
    pub status: ActionStatus,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource_id: Option<u64>,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub region: Option<RegionRef>,
    #[serde(default)]
    pub region_slug: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    /// Region slug, from `region_slug` or the embedded region.
    pub fn region_name(&self) -> String {
        self.region_slug
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.region.as_ref().map(|r| r.slug.clone()))
            .unwrap_or_default()
    }
}

impl Tabular for Action {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("ID", "ID", |a| a.id.to_string()),
            Column::new("Status", "Status", |a| a.status.to_string()),
            Column::new("Type", "Type", |a| a.kind.clone()),
            Column::new("StartedAt", "Started At", |a| {
                format::opt_time(a.started_at.as_ref())
            }),
            Column::new("CompletedAt", "Completed At", |a| {
                format::opt_time(a.completed_at.as_ref())
            }),
            Column::new("ResourceID", "Resource ID", |a| {
                a.resource_id.map(|id| id.to_string()).unwrap_or_default()
            }),
            Column::new("ResourceType", "Resource Type", |a| a.resource_type.clone()),
            Column::new("Region", "Region", Action::region_name),
        ]
    }
}

/// Name-only view of an app spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSpec {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A deployment reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentRef {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An App Platform application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    #[serde(default)]
    pub spec: AppSpec,
    #[serde(default)]
    pub default_ingress: String,
    #[serde(default)]
    pub live_url: String,
    #[serde(default)]
    pub active_deployment: Option<DeploymentRef>,
    #[serde(default)]
    pub in_progress_deployment: Option<DeploymentRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deployment_id(d: &Option<DeploymentRef>) -> String {
    d.as_ref().map(|d| d.id.clone()).unwrap_or_default()
}

impl Tabular for App {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("ID", "ID", |a| a.id.clone()),
            Column::new("Spec.Name", "Spec Name", |a| a.spec.name.clone()),
            Column::new("DefaultIngress", "Default Ingress", |a| a.default_ingress.clone()),
            Column::new("ActiveDeployment.ID", "Active Deployment ID", |a| {
                deployment_id(&a.active_deployment)
            }),
            Column::new("InProgressDeployment.ID", "In Progress Deployment ID", |a| {
                deployment_id(&a.in_progress_deployment)
            }),
            Column::new("Created", "Created At", |a| {
                format::opt_time(a.created_at.as_ref())
            }),
            Column::new("Updated", "Updated At", |a| {
                format::opt_time(a.updated_at.as_ref())
            }),
        ]
    }
}

/// Log URLs returned by the logs endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppLogs {
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub historic_urls: Vec<String>,
}

impl AppLogs {
    /// URLs to read, in order.
    pub fn urls(&self, follow: bool) -> Vec<String> {
        if follow {
            if let Some(url) = self.live_url.as_ref().filter(|u| !u.is_empty()) {
                return vec![url.clone()];
            }
        }
        self.historic_urls
            .iter()
            .filter(|u| !u.is_empty())
            .cloned()
            .collect()
    }
}

/// Log categories accepted by `apps logs --type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Build,
    Deploy,
    Run,
}

impl LogType {
    pub fn as_query(self) -> &'static str {
        match self {
            LogType::Build => "BUILD",
            LogType::Deploy => "DEPLOY",
            LogType::Run => "RUN",
        }
    }
}

impl std::str::FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(LogType::Build),
            "deploy" => Ok(LogType::Deploy),
            "run" => Ok(LogType::Run),
            other => Err(format!(
                "invalid log type {:?}, expected one of: build, deploy, run",
                other
            )),
        }
    }
}

//! account commands - Show account details and API rate limits

use anyhow::Result;
use async_trait::async_trait;

use crate::api::resources::{Account, RateLimitInfo};
use crate::api::Request;
use crate::cli::registry::{CommandSpec, Handler};
use crate::engine::Invocation;

const ACCOUNT_PATH: &str = "/v2/account";

pub fn command() -> CommandSpec {
    CommandSpec::group("account", "Display commands that retrieve account details")
        .long_about(
            "The subcommands of `doctl account` retrieve information about DigitalOcean \
             accounts.\n\nFor example, `doctl account get` retrieves account profile details, \
             and `doctl account ratelimit` retrieves API usage details.",
        )
        .child(
            CommandSpec::leaf("get", "Retrieve account profile details", Get)
                .alias("g")
                .long_about(
                    "Retrieve the following details from your account profile:\n\n\
                     - Email address\n- Droplet limit\n- Email verification status\n\
                     - UUID\n- Account status",
                ),
        )
        .child(
            CommandSpec::leaf(
                "ratelimit",
                "Retrieve your API usage and the remaining quota",
                RateLimit,
            )
            .alias("rl"),
        )
}

struct Get;

#[async_trait]
impl Handler for Get {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let client = inv.client()?;
        let account: Account = client.get(ACCOUNT_PATH, "account").await?;
        inv.display_one(&account)
    }
}

struct RateLimit;

#[async_trait]
impl Handler for RateLimit {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let client = inv.client()?;
        let response = client.send(&Request::get(ACCOUNT_PATH)).await?;
        inv.display_one(&RateLimitInfo::from(&response.rate))
    }
}

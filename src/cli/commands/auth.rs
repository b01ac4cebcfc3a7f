//! auth commands - Manage authentication contexts
//!
//! Tokens are stored in the persisted document: the `default` context at the
//! top-level `access-token` key, every other context under `auth-contexts`.
//! All writes go through [`document::edit_async`], which holds the config
//! lock on the blocking pool.

use std::io::Write;

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use serde_yaml::Value;

use crate::api::resources::Account;
use crate::cli::registry::{CommandSpec, Handler};
use crate::core::config::document::{self, Document, CONTEXTS_KEY, CONTEXT_KEY, DEFAULT_CONTEXT};
use crate::core::config::{settings, ConfigError};
use crate::engine::Invocation;

const TOKEN_PROMPT: &str = "Enter your access token: ";

pub fn command() -> CommandSpec {
    CommandSpec::group("auth", "Display commands for authenticating doctl with an account")
        .long_about(
            "The `doctl auth` commands allow you to authenticate doctl for use with your \
             DigitalOcean account using tokens that you generate in the control panel.\n\n\
             Use `--context` to keep tokens for several accounts side by side.",
        )
        .child(
            CommandSpec::leaf("init", "Initialize doctl to use a specific account", Init)
                .long_about(
                    "Prompts for an API token, validates it against the account endpoint, \
                     and stores it for the selected context. A token given with \
                     `--access-token` or `DIGITALOCEAN_ACCESS_TOKEN` is used without \
                     prompting.",
                ),
        )
        .child(CommandSpec::leaf(
            "switch",
            "Switch between authentication contexts",
            Switch,
        ))
        .child(
            CommandSpec::leaf("list", "List available authentication contexts", List).alias("ls"),
        )
        .child(
            CommandSpec::leaf("remove", "Remove authentication contexts", Remove)
                .alias("rm")
                .long_about(
                    "Removes the context given with `--context`. The default context cannot \
                     be removed.",
                ),
        )
}

struct Init;

#[async_trait]
impl Handler for Init {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let context = inv.settings.context_name();
        let token = match inv
            .settings
            .string(settings::ACCESS_TOKEN)
            .filter(|t| !t.is_empty())
        {
            Some(token) => token,
            None => {
                writeln!(
                    inv.err,
                    "Please authenticate doctl for use with your DigitalOcean account. \
                     You can generate a token in the control panel at \
                     https://cloud.digitalocean.com/account/api/tokens\n"
                )?;
                inv.err.flush()?;
                inv.interaction
                    .prompt_secret(TOKEN_PROMPT)
                    .context("failed to read access token")?
                    .trim()
                    .to_string()
            }
        };
        if token.is_empty() {
            bail!("access token must not be empty");
        }

        write!(inv.err, "\nValidating token... ")?;
        inv.err.flush()?;
        let client = inv.client_with_token(token.clone())?;
        match client.get::<Account>("/v2/account", "account").await {
            Ok(_) => writeln!(inv.err, "OK")?,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                writeln!(inv.err, "invalid token")?;
                return Err(
                    anyhow::Error::new(e).context("Unable to use supplied token to access API")
                );
            }
        }

        let path = inv.settings.config_path().to_path_buf();
        let key = Document::token_path(&context)
            .into_iter()
            .map(str::to_string)
            .collect();
        document::persist_async(path.clone(), key, Value::String(token)).await?;
        tracing::debug!(context = %context, path = %path.display(), "stored access token");
        Ok(())
    }
}

struct Switch;

#[async_trait]
impl Handler for Switch {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let context = inv.settings.context_name();
        let path = inv.settings.config_path().to_path_buf();
        let target = context.clone();
        document::edit_async(path, move |doc| {
            if !doc.has_context(&target) {
                return Err(ConfigError::ContextMissing(target));
            }
            doc.set(&[CONTEXT_KEY], Value::String(target));
            Ok(())
        })
        .await?;
        writeln!(inv.out, "Now using context [{}] by default", context)?;
        Ok(())
    }
}

struct List;

#[async_trait]
impl Handler for List {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        let current = inv.settings.context_name();
        let names = inv.settings.document().context_names();
        for name in names {
            if name == current {
                writeln!(inv.out, "{} (current)", name)?;
            } else {
                writeln!(inv.out, "{}", name)?;
            }
        }
        Ok(())
    }
}

struct Remove;

#[async_trait]
impl Handler for Remove {
    async fn run(&self, inv: &mut Invocation) -> Result<()> {
        if !inv.settings.is_explicit(settings::CONTEXT) {
            bail!("a context must be given with --context");
        }
        let context = inv.settings.context_name();
        if context == DEFAULT_CONTEXT {
            bail!("the default context cannot be removed");
        }
        let path = inv.settings.config_path().to_path_buf();
        document::edit_async(path, move |doc| {
            if doc.remove(&[CONTEXTS_KEY, context.as_str()]).is_none() {
                return Err(ConfigError::ContextMissing(context));
            }
            if doc.current_context() == context {
                doc.set(&[CONTEXT_KEY], Value::String(DEFAULT_CONTEXT.to_string()));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }
}

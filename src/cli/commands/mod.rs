//! cli::commands
//!
//! Built-in commands.
//!
//! # Architecture
//!
//! Each file declares one command family as a [`CommandSpec`] subtree and the
//! [`Handler`](crate::cli::Handler)s behind it. Handlers:
//! 1. Read positional arguments and settings from the invocation
//! 2. Build a client and issue requests
//! 3. Render results through the invocation's output
//!
//! [`registry`] assembles the full tree. It is a pure function so that the
//! completion command can rebuild the tree it is part of.

mod account;
mod actions;
mod apps;
mod auth;
mod completion;
mod version;

pub use completion::script as completion_script;
pub use version::version_line;

use super::registry::{CommandSpec, Registry, RegistryError, PROGRAM};
use crate::core::config::settings::global_settings;

/// The built-in command tree.
pub fn registry() -> Result<Registry, RegistryError> {
    let about = "doctl is a command line interface (CLI) for the DigitalOcean API.";
    let root = CommandSpec::group(PROGRAM, about)
        .long_about(
            "doctl is a command line interface (CLI) for the DigitalOcean API.\n\n\
             Settings are read from flags, then DIGITALOCEAN_* environment variables, \
             then the config file, then built-in defaults.",
        )
        .child(account::command())
        .child(auth::command())
        .child(
            CommandSpec::group("compute", "Display commands that manage infrastructure")
                .alias("c")
                .long_about(
                    "The subcommands under `doctl compute` are for managing DigitalOcean \
                     resources.",
                )
                .child(actions::command()),
        )
        .child(apps::command())
        .child(version::command())
        .child(completion::command());
    Registry::build(root, global_settings())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tree_builds() {
        let registry = registry().unwrap();
        let (id, consumed) = registry.walk(&["compute", "action", "wait"]);
        assert_eq!(consumed, 3);
        assert!(registry.get(id).handler.is_some());
        registry.to_clap().debug_assert();
    }

    #[test]
    fn delete_is_destructive() {
        let registry = registry().unwrap();
        let (id, _) = registry.walk(&["apps", "rm"]);
        assert_eq!(registry.dotted(id), "apps.delete");
        assert_eq!(registry.get(id).destructive, Some("delete this app"));
    }
}

//! cli::registry
//!
//! The command descriptor tree.
//!
//! # Design
//!
//! Commands are declared as nested [`CommandSpec`]s and flattened once into
//! an arena of [`Descriptor`]s. Index 0 is the root. Parents and children
//! refer to each other by index, so the tree has no cycles and is immutable
//! after [`Registry::build`].
//!
//! Declaration mistakes are caught at build time, not when a user runs the
//! command:
//! - two siblings answering to the same name or alias
//! - a local flag reusing the long or short form of an inherited flag
//!
//! The arena is turned into a `clap::Command` for parsing, help, and shell
//! completion. Flags carry no clap defaults; the resolver applies defaults
//! after environment and document lookups.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgAction};
use thiserror::Error;

use crate::core::config::{SettingKind, SettingSpec};
use crate::engine::Invocation;

/// Name of the program.
pub const PROGRAM: &str = "doctl";

/// Clap id of the positional-argument collector.
pub const POSITIONAL: &str = "args";

/// Long name of the confirmation-bypass flag on destructive commands.
pub const FORCE: &str = "force";

/// Errors found while building the tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("ambiguous command name {word:?} under {parent}")]
    Ambiguous { parent: String, word: String },

    #[error("flag --{flag} on {command} conflicts with an inherited flag")]
    FlagConflict { command: String, flag: String },

    #[error("short flag -{short} on {command} conflicts with an inherited flag")]
    ShortConflict { command: String, short: char },
}

/// A command implementation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(&self, inv: &mut Invocation) -> anyhow::Result<()>;
}

/// Positional argument bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgCount {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl ArgCount {
    pub const NONE: ArgCount = ArgCount {
        min: 0,
        max: Some(0),
    };

    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }
}

/// Declaration of a command and its subtree.
pub struct CommandSpec {
    name: &'static str,
    aliases: Vec<&'static str>,
    short: &'static str,
    long: &'static str,
    hidden: bool,
    usage: &'static str,
    args: ArgCount,
    flags: Vec<SettingSpec>,
    destructive: Option<&'static str>,
    handler: Option<Arc<dyn Handler>>,
    children: Vec<CommandSpec>,
}

impl CommandSpec {
    /// A command that only groups subcommands.
    pub fn group(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            short,
            long: "",
            hidden: false,
            usage: "",
            args: ArgCount::NONE,
            flags: Vec::new(),
            destructive: None,
            handler: None,
            children: Vec::new(),
        }
    }

    /// A runnable command.
    pub fn leaf(name: &'static str, short: &'static str, handler: impl Handler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::group(name, short)
        }
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn long_about(mut self, long: &'static str) -> Self {
        self.long = long;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Positional arguments, e.g. `args(ArgCount::exactly(1), "<action-id>")`.
    pub fn args(mut self, count: ArgCount, usage: &'static str) -> Self {
        self.args = count;
        self.usage = usage;
        self
    }

    pub fn flag(mut self, flag: SettingSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Require confirmation before running. `action` completes the question
    /// "Are you sure you want to <action>?".
    pub fn destructive(mut self, action: &'static str) -> Self {
        self.destructive = Some(action);
        self.flags.push(
            SettingSpec::bool(FORCE)
                .short('f')
                .help("Skip the confirmation prompt")
                .default_bool(false)
                .no_doc(),
        );
        self
    }

    pub fn child(mut self, child: CommandSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// One node of the flattened tree.
pub struct Descriptor {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub short: &'static str,
    pub long: &'static str,
    pub hidden: bool,
    pub usage: &'static str,
    pub args: ArgCount,
    /// Flags declared on this command, bound to its path.
    pub flags: Vec<SettingSpec>,
    pub destructive: Option<&'static str>,
    pub handler: Option<Arc<dyn Handler>>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Descriptor {
    fn answers_to(&self, word: &str) -> bool {
        self.name == word || self.aliases.iter().any(|a| *a == word)
    }
}

/// The immutable command tree.
pub struct Registry {
    nodes: Vec<Descriptor>,
    globals: Vec<SettingSpec>,
}

impl Registry {
    /// Flatten `root` into an arena. `globals` are inherited by every command.
    pub fn build(root: CommandSpec, globals: Vec<SettingSpec>) -> Result<Self, RegistryError> {
        let mut globals = globals;
        for spec in &mut globals {
            spec.bind(&[]);
        }
        let mut registry = Self {
            nodes: Vec::new(),
            globals,
        };
        registry.insert(root, None, &[])?;
        Ok(registry)
    }

    fn insert(
        &mut self,
        spec: CommandSpec,
        parent: Option<usize>,
        parent_path: &[&'static str],
    ) -> Result<usize, RegistryError> {
        let id = self.nodes.len();
        let path: Vec<&'static str> = match parent {
            None => Vec::new(),
            Some(_) => parent_path.iter().copied().chain([spec.name]).collect(),
        };

        let mut flags = spec.flags;
        for flag in &mut flags {
            flag.bind(&path);
        }

        if let Some(p) = parent {
            let siblings = &self.nodes[p].children;
            for word in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
                if siblings.iter().any(|&s| self.nodes[s].answers_to(word)) {
                    return Err(RegistryError::Ambiguous {
                        parent: self.display_path(p),
                        word: word.to_string(),
                    });
                }
            }
        }
        let mut seen = HashSet::new();
        for word in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
            if !seen.insert(*word) {
                return Err(RegistryError::Ambiguous {
                    parent: parent.map_or_else(|| PROGRAM.to_string(), |p| self.display_path(p)),
                    word: word.to_string(),
                });
            }
        }

        self.nodes.push(Descriptor {
            name: spec.name,
            aliases: spec.aliases,
            short: spec.short,
            long: spec.long,
            hidden: spec.hidden,
            usage: spec.usage,
            args: spec.args,
            flags: Vec::new(),
            destructive: spec.destructive,
            handler: spec.handler,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }

        self.check_flags(id, &flags)?;
        self.nodes[id].flags = flags;

        for child in spec.children {
            self.insert(child, Some(id), &path)?;
        }
        Ok(id)
    }

    fn check_flags(&self, id: usize, flags: &[SettingSpec]) -> Result<(), RegistryError> {
        let inherited = self.inherited_flags(id);
        let mut longs: HashSet<&str> = inherited.iter().map(|f| f.long).collect();
        let mut shorts: HashSet<char> = inherited.iter().filter_map(|f| f.short).collect();
        // Reserved by clap.
        longs.insert("help");
        shorts.insert('h');
        if id == 0 {
            longs.insert("version");
            shorts.insert('V');
        }

        for flag in flags {
            if !longs.insert(flag.long) {
                return Err(RegistryError::FlagConflict {
                    command: self.display_path(id),
                    flag: flag.long.to_string(),
                });
            }
            if let Some(short) = flag.short {
                if !shorts.insert(short) {
                    return Err(RegistryError::ShortConflict {
                        command: self.display_path(id),
                        short,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Descriptor {
        &self.nodes[0]
    }

    pub fn get(&self, id: usize) -> &Descriptor {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names from the root's child down to `id`.
    pub fn path(&self, id: usize) -> Vec<&'static str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = &self.nodes[c];
            if node.parent.is_some() {
                path.push(node.name);
            }
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Dotted path, e.g. `compute.action.get`.
    pub fn dotted(&self, id: usize) -> String {
        self.path(id).join(".")
    }

    fn display_path(&self, id: usize) -> String {
        let path = self.path(id);
        if path.is_empty() {
            PROGRAM.to_string()
        } else {
            format!("{} {}", PROGRAM, path.join(" "))
        }
    }

    /// The child of `id` named or aliased `word`.
    pub fn find_child(&self, id: usize, word: &str) -> Option<usize> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].answers_to(word))
    }

    /// Walk `words` from the root. Returns the deepest command reached and
    /// how many words were consumed; the rest are positional arguments.
    pub fn walk(&self, words: &[&str]) -> (usize, usize) {
        let mut id = 0;
        let mut consumed = 0;
        for word in words {
            match self.find_child(id, word) {
                Some(child) => {
                    id = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        (id, consumed)
    }

    /// Global flags plus persistent flags of every ancestor of `id`.
    pub fn inherited_flags(&self, id: usize) -> Vec<&SettingSpec> {
        let mut flags: Vec<&SettingSpec> = self.globals.iter().collect();
        let mut ancestors = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(c) = current {
            ancestors.push(c);
            current = self.nodes[c].parent;
        }
        for a in ancestors.into_iter().rev() {
            flags.extend(self.nodes[a].flags.iter().filter(|f| f.persistent));
        }
        flags
    }

    /// Every setting visible to command `id`.
    pub fn settings_for(&self, id: usize) -> Vec<SettingSpec> {
        let mut settings: Vec<SettingSpec> =
            self.inherited_flags(id).into_iter().cloned().collect();
        settings.extend(self.nodes[id].flags.iter().cloned());
        settings
    }

    /// Long help for command `id`.
    pub fn help_for(&self, id: usize) -> String {
        let mut argv = vec![PROGRAM];
        argv.extend(self.path(id));
        argv.push("--help");
        match self.to_clap().try_get_matches_from(argv) {
            Err(e) => e.render().to_string(),
            Ok(_) => String::new(),
        }
    }

    /// The clap command tree used for parsing, help, and completion.
    pub fn to_clap(&self) -> clap::Command {
        let mut root = self
            .clap_command(0)
            .version(env!("CARGO_PKG_VERSION"))
            .disable_help_subcommand(true);
        for spec in &self.globals {
            root = root.arg(clap_arg(spec, true));
        }
        root
    }

    fn clap_command(&self, id: usize) -> clap::Command {
        let node = &self.nodes[id];
        let mut cmd = clap::Command::new(node.name)
            .about(node.short)
            .visible_aliases(node.aliases.iter().copied())
            .hide(node.hidden);
        if !node.long.is_empty() {
            cmd = cmd.long_about(node.long);
        }
        for flag in &node.flags {
            cmd = cmd.arg(clap_arg(flag, flag.persistent));
        }
        if node.handler.is_some() {
            // Counts are checked by the dispatcher so the message names the command.
            cmd = cmd.arg(
                Arg::new(POSITIONAL)
                    .value_name("ARGS")
                    .num_args(0..)
                    .hide(node.args.max == Some(0))
                    .action(ArgAction::Append),
            );
            if !node.usage.is_empty() {
                let usage = format!("{} {} [flags]", self.display_path(id), node.usage);
                cmd = cmd.override_usage(usage);
            }
        }
        for &child in &node.children {
            cmd = cmd.subcommand(self.clap_command(child));
        }
        cmd
    }
}

/// Translate a setting into a clap argument.
///
/// Booleans take an optional `=value` so that `--trace` and `--trace=false`
/// both work while an absent flag stays distinguishable.
pub fn clap_arg(spec: &SettingSpec, global: bool) -> Arg {
    let mut arg = Arg::new(spec.canonical.clone())
        .long(spec.long)
        .help(spec.help)
        .global(global)
        .hide(spec.hidden);
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }
    match spec.kind {
        SettingKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(clap::builder::BoolishValueParser::new())
            .action(ArgAction::Set),
        SettingKind::Int => arg
            .value_name(spec.long.to_uppercase())
            .value_parser(clap::value_parser!(i64))
            .allow_negative_numbers(true)
            .action(ArgAction::Set),
        SettingKind::Str => arg
            .value_name(spec.long.to_uppercase())
            .action(ArgAction::Set),
        SettingKind::List => arg
            .value_name(spec.long.to_uppercase())
            .value_delimiter(',')
            .action(ArgAction::Append),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::global_settings;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn run(&self, _inv: &mut Invocation) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn tree() -> CommandSpec {
        CommandSpec::group(PROGRAM, "test").child(
            CommandSpec::group("compute", "compute").child(
                CommandSpec::group("action", "actions")
                    .flag(SettingSpec::string("region").persistent())
                    .child(
                        CommandSpec::leaf("get", "get", Noop)
                            .alias("g")
                            .args(ArgCount::exactly(1), "<action-id>"),
                    )
                    .child(CommandSpec::leaf("list", "list", Noop).alias("ls")),
            ),
        )
    }

    #[test]
    fn walk_follows_names_and_aliases() {
        let registry = Registry::build(tree(), global_settings()).unwrap();
        let (id, consumed) = registry.walk(&["compute", "action", "g", "123"]);
        assert_eq!(consumed, 3);
        assert_eq!(registry.dotted(id), "compute.action.get");

        let (id, _) = registry.walk(&["compute", "action", "ls"]);
        assert_eq!(registry.get(id).name, "list");
    }

    #[test]
    fn persistent_flags_are_inherited() {
        let registry = Registry::build(tree(), global_settings()).unwrap();
        let (id, _) = registry.walk(&["compute", "action", "get"]);
        let settings = registry.settings_for(id);
        assert!(settings
            .iter()
            .any(|s| s.canonical == "compute.action.region"));
        assert!(settings.iter().any(|s| s.long == "access-token"));
    }

    #[test]
    fn duplicate_alias_rejected() {
        let spec = CommandSpec::group(PROGRAM, "test")
            .child(CommandSpec::leaf("list", "list", Noop).alias("ls"))
            .child(CommandSpec::leaf("ls", "other", Noop));
        let err = Registry::build(spec, global_settings()).err().unwrap();
        assert_eq!(
            err,
            RegistryError::Ambiguous {
                parent: PROGRAM.into(),
                word: "ls".into()
            }
        );
    }

    #[test]
    fn shadowing_inherited_flag_rejected() {
        let spec = CommandSpec::group(PROGRAM, "test")
            .child(CommandSpec::leaf("get", "get", Noop).flag(SettingSpec::string("output")));
        assert!(matches!(
            Registry::build(spec, global_settings()),
            Err(RegistryError::FlagConflict { .. })
        ));

        let spec = CommandSpec::group(PROGRAM, "test")
            .child(CommandSpec::leaf("get", "get", Noop).flag(SettingSpec::string("x").short('t')));
        assert!(matches!(
            Registry::build(spec, global_settings()),
            Err(RegistryError::ShortConflict { short: 't', .. })
        ));
    }

    #[test]
    fn destructive_adds_force_flag() {
        let spec = CommandSpec::group(PROGRAM, "test")
            .child(CommandSpec::leaf("delete", "delete", Noop).destructive("delete this"));
        let registry = Registry::build(spec, global_settings()).unwrap();
        let (id, _) = registry.walk(&["delete"]);
        let force = registry.get(id).flags.iter().find(|f| f.long == FORCE).unwrap();
        assert_eq!(force.short, Some('f'));
        assert_eq!(force.canonical, "delete.force");
    }

    #[test]
    fn help_lists_children() {
        let registry = Registry::build(tree(), global_settings()).unwrap();
        let (id, _) = registry.walk(&["compute", "action"]);
        let help = registry.help_for(id);
        assert!(help.contains("get"));
        assert!(help.contains("list"));
        assert!(help.contains("--access-token"));
    }

    #[test]
    fn clap_tree_is_consistent() {
        let registry = Registry::build(tree(), global_settings()).unwrap();
        registry.to_clap().debug_assert();
    }
}

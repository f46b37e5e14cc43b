//! Command registry.
//!
//! Commands are declared up front on a [`RegistryBuilder`] with a
//! [`CommandDecl`] and a bound handler closure. [`RegistryBuilder::build`]
//! validates every declaration and returns an immutable [`Registry`]; there
//! is no way to register after that point.
//!
//! Top-level names and aliases live in flat maps. Grouped sub-commands hang
//! off their group node and are reached by exact, case-insensitive name
//! match only; aliases always resolve at the top level.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::context::CommandContext;
use super::dispatch::Dispatcher;
use super::origin::OriginMask;
use crate::security::is_permission_path;

/// Handler body bound to a leaf command.
pub type CommandHandler =
    Arc<dyn Fn(&mut CommandContext, &Dispatcher<'_>) -> anyhow::Result<()> + Send + Sync>;

pub type NodeId = usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command '{name}' is already registered in {scope}")]
    Duplicate { name: String, scope: String },
    #[error("alias '{alias}' of '{command}' clashes with an existing name or alias")]
    DuplicateAlias { alias: String, command: String },
    #[error("parent group '{parent}' of '{name}' is not registered")]
    UnknownParent { name: String, parent: String },
    #[error("parent '{parent}' of '{name}' is a command, not a group")]
    ParentNotGroup { name: String, parent: String },
    #[error("command '{command}' declares malformed permission '{permission}'")]
    MalformedPermission { command: String, permission: String },
    #[error("invalid command name '{0}'")]
    InvalidName(String),
}

// ── Declarations ────────────────────────────────────────────────────

/// Declaration of a leaf command.
#[derive(Debug, Clone, Default)]
pub struct CommandDecl {
    pub name: String,
    pub alias: Option<String>,
    pub origin: OriginMask,
    pub description: String,
    pub usage: String,
    /// Dotted path of the owning group, if any
    pub parent: Option<String>,
    pub permissions: Vec<String>,
}

impl CommandDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Top-level shortcut for this command. For a grouped command the alias
    /// reaches the command directly, so only the command's own origin and
    /// permission gates apply; the parent group's gates (owner-only
    /// included) are skipped. Leave grouped commands without an alias when
    /// the group is what restricts access.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: OriginMask) -> Self {
        self.origin = origin;
        self
    }

    /// Origin mask from text such as `"private/server"` or `"all/ownerOnly"`.
    #[must_use]
    pub fn origin_str(self, origins: &str) -> Self {
        self.origin(OriginMask::parse(origins))
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Comma-separated permission paths; blanks are skipped.
    #[must_use]
    pub fn permissions(mut self, list: &str) -> Self {
        self.permissions = list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

/// Declaration of a command group.
#[derive(Debug, Clone, Default)]
pub struct GroupDecl {
    pub name: String,
    pub origin: OriginMask,
    pub description: String,
    pub parent: Option<String>,
}

impl GroupDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn origin(mut self, origin: OriginMask) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn origin_str(self, origins: &str) -> Self {
        self.origin(OriginMask::parse(origins))
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

// ── Nodes ───────────────────────────────────────────────────────────

pub(crate) struct Leaf {
    alias: Option<String>,
    permissions: Vec<String>,
    usage: String,
    pub(crate) handler: CommandHandler,
}

pub(crate) enum NodeKind {
    Leaf(Leaf),
    Group { children: BTreeMap<String, NodeId> },
}

/// A registered command or group.
pub struct CommandNode {
    name: String,
    path: String,
    description: String,
    origin: OriginMask,
    pub(crate) kind: NodeKind,
}

impl CommandNode {
    /// Lowercase name within its scope
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full dotted path, e.g. `text.upper`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn origin(&self) -> OriginMask {
        self.origin
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    pub fn alias(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf(leaf) => leaf.alias.as_deref(),
            NodeKind::Group { .. } => None,
        }
    }

    /// Usage line, already prefixed with the command name.
    pub fn usage(&self) -> &str {
        match &self.kind {
            NodeKind::Leaf(leaf) => &leaf.usage,
            NodeKind::Group { .. } => "",
        }
    }

    pub fn permissions(&self) -> &[String] {
        match &self.kind {
            NodeKind::Leaf(leaf) => &leaf.permissions,
            NodeKind::Group { .. } => &[],
        }
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("path", &self.path)
            .field("origin", &self.origin)
            .field("group", &self.is_group())
            .finish_non_exhaustive()
    }
}

/// `usage` rendered as `"<name> <usage>"` unless it already starts with the name.
pub fn computed_usage(name: &str, usage: &str) -> String {
    if usage.is_empty() || usage.starts_with(name) {
        usage.to_string()
    } else {
        format!("{name} {usage}")
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '|' | '"' | '\\'))
}

// ── Builder ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RegistryBuilder {
    groups: Vec<GroupDecl>,
    commands: Vec<(CommandDecl, CommandHandler)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(mut self, decl: GroupDecl) -> Self {
        self.groups.push(decl);
        self
    }

    #[must_use]
    pub fn command<F>(mut self, decl: CommandDecl, handler: F) -> Self
    where
        F: Fn(&mut CommandContext, &Dispatcher<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.commands.push((decl, Arc::new(handler)));
        self
    }

    /// Validate every declaration and seal the registry.
    ///
    /// Groups are registered before commands, shallowest parent first, so
    /// declaration order does not matter.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut registry = Registry::default();

        let mut groups = self.groups;
        groups.sort_by_key(|g| g.parent.as_deref().map_or(0, |p| p.split('.').count()));

        for decl in groups {
            let GroupDecl {
                name,
                origin,
                description,
                parent,
            } = decl;
            registry.insert(
                &name,
                parent.as_deref(),
                description,
                origin,
                NodeKind::Group {
                    children: BTreeMap::new(),
                },
            )?;
        }

        for (decl, handler) in self.commands {
            for permission in &decl.permissions {
                if !is_permission_path(permission) {
                    return Err(RegistryError::MalformedPermission {
                        command: decl.name.clone(),
                        permission: permission.clone(),
                    });
                }
            }

            if !decl.origin.is_accessible() {
                tracing::warn!(
                    command = %decl.name,
                    origin = %decl.origin,
                    "command is not reachable from any origin"
                );
            }

            let alias = decl.alias.as_deref().map(str::to_lowercase);
            let usage = computed_usage(&decl.name.to_lowercase(), &decl.usage);
            let id = registry.insert(
                &decl.name,
                decl.parent.as_deref(),
                decl.description,
                decl.origin,
                NodeKind::Leaf(Leaf {
                    alias: alias.clone(),
                    permissions: decl.permissions,
                    usage,
                    handler,
                }),
            )?;

            if let Some(alias) = alias {
                if !valid_name(&alias) {
                    return Err(RegistryError::InvalidName(alias));
                }
                if registry.names.contains_key(&alias) || registry.aliases.contains_key(&alias) {
                    return Err(RegistryError::DuplicateAlias {
                        alias,
                        command: registry.nodes[id].path.clone(),
                    });
                }
                registry.aliases.insert(alias, id);
            }
        }

        tracing::info!(
            commands = registry.len(),
            top_level = registry.names.len(),
            aliases = registry.aliases.len(),
            "command registry built"
        );
        Ok(registry)
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Sealed command tree.
#[derive(Default)]
pub struct Registry {
    nodes: Vec<CommandNode>,
    names: HashMap<String, NodeId>,
    aliases: HashMap<String, NodeId>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn insert(
        &mut self,
        name: &str,
        parent: Option<&str>,
        description: String,
        origin: OriginMask,
        kind: NodeKind,
    ) -> Result<NodeId, RegistryError> {
        let key = name.to_lowercase();
        if !valid_name(&key) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let id = self.nodes.len();
        let path = match parent {
            None => {
                if self.names.contains_key(&key) || self.aliases.contains_key(&key) {
                    return Err(RegistryError::Duplicate {
                        name: key,
                        scope: "top level".into(),
                    });
                }
                self.names.insert(key.clone(), id);
                key.clone()
            }
            Some(parent) => {
                let parent_id =
                    self.resolve_names(parent)
                        .ok_or_else(|| RegistryError::UnknownParent {
                            name: key.clone(),
                            parent: parent.to_string(),
                        })?;
                let parent_path = self.nodes[parent_id].path.clone();
                let NodeKind::Group { children } = &mut self.nodes[parent_id].kind else {
                    return Err(RegistryError::ParentNotGroup {
                        name: key,
                        parent: parent.to_string(),
                    });
                };
                if children.contains_key(&key) {
                    return Err(RegistryError::Duplicate {
                        name: key,
                        scope: format!("group '{parent_path}'"),
                    });
                }
                children.insert(key.clone(), id);
                format!("{parent_path}.{key}")
            }
        };

        self.nodes.push(CommandNode {
            name: key,
            path,
            description,
            origin,
            kind,
        });
        Ok(id)
    }

    /// Walk a dotted path by names only.
    fn resolve_names(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('.');
        let mut id = *self.names.get(&segments.next()?.to_lowercase())?;
        for segment in segments {
            id = self.child_id(id, segment)?;
        }
        Some(id)
    }

    fn child_id(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Group { children } => children.get(&name.to_lowercase()).copied(),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Resolve a top-level token: aliases first, then names.
    pub fn lookup(&self, token: &str) -> Option<&CommandNode> {
        let key = token.to_lowercase();
        self.aliases
            .get(&key)
            .or_else(|| self.names.get(&key))
            .map(|&id| &self.nodes[id])
    }

    /// Direct child of a group by exact name. `None` for leaves.
    pub fn child(&self, group: &CommandNode, name: &str) -> Option<&CommandNode> {
        match &group.kind {
            NodeKind::Group { children } => children
                .get(&name.to_lowercase())
                .map(|&id| &self.nodes[id]),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Children of a group in name order. Empty for leaves.
    pub fn children<'a>(&'a self, group: &'a CommandNode) -> impl Iterator<Item = &'a CommandNode> + 'a {
        let ids = match &group.kind {
            NodeKind::Group { children } => Some(children.values()),
            NodeKind::Leaf(_) => None,
        };
        ids.into_iter().flatten().map(|&id| &self.nodes[id])
    }

    /// Resolve a dotted path such as `text.upper`. The first segment may be
    /// an alias; the rest must be exact child names.
    pub fn find_command(&self, path: &str) -> Option<&CommandNode> {
        let mut segments = path.split('.');
        let mut node = self.lookup(segments.next()?)?;
        for segment in segments {
            node = self.child(node, segment)?;
        }
        Some(node)
    }

    /// Top-level commands and groups sorted by name.
    pub fn top_level(&self) -> Vec<&CommandNode> {
        let mut nodes: Vec<&CommandNode> = self.names.values().map(|&id| &self.nodes[id]).collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Number of leaf commands.
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Leaf(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.len())
            .field("top_level", &self.names.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

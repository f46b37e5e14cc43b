//! Entry point from an inbound message to a finished pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::builtin::register_builtins;
use super::context::{CommandContext, Invocation};
use super::dispatch::{Dispatcher, Status};
use super::mention::{MentionResolver, Trigger};
use super::origin::Origin;
use super::registry::{Registry, RegistryBuilder, RegistryError};
use crate::channels::{InboundMessage, ReplySurface};
use crate::config::{Config, Messages};
use crate::security::{AllowAll, ConfiguredOwner, OwnerIdentity, PermissionCheck};

pub struct CommandEngine {
    registry: Arc<Registry>,
    resolver: MentionResolver,
    permissions: Arc<dyn PermissionCheck>,
    owner: Arc<dyn OwnerIdentity>,
    messages: Messages,
    enabled: bool,
    shutdown: Arc<AtomicBool>,
}

impl CommandEngine {
    /// Engine over an already-built registry. Permissions default to
    /// [`AllowAll`] and the owner comes from `config`.
    pub fn new(registry: Registry, config: &Config) -> Self {
        Self {
            registry: Arc::new(registry),
            resolver: MentionResolver::new(
                config.bot.tag.clone(),
                config.bot.self_id,
                config.bot.use_mention,
            ),
            permissions: Arc::new(AllowAll),
            owner: Arc::new(ConfiguredOwner(config.bot.owner_id)),
            messages: config.messages.clone(),
            enabled: config.bot.enable_commands,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine with the built-in commands plus whatever `extend` registers.
    pub fn with_builtins(
        config: &Config,
        extend: impl FnOnce(RegistryBuilder) -> RegistryBuilder,
    ) -> Result<Self, RegistryError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let builder = register_builtins(Registry::builder(), Arc::clone(&shutdown));
        let registry = extend(builder).build()?;
        Ok(Self {
            shutdown,
            ..Self::new(registry, config)
        })
    }

    #[must_use]
    pub fn permissions(mut self, permissions: Arc<dyn PermissionCheck>) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: Arc<dyn OwnerIdentity>) -> Self {
        self.owner = owner;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolver(&self) -> &MentionResolver {
        &self.resolver
    }

    /// Set once the `stop` command ran.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(
            &self.registry,
            self.permissions.as_ref(),
            self.owner.as_ref(),
            &self.messages,
        )
    }

    /// Handle one inbound message. Returns `None` when the message is not a
    /// command (no trigger, nothing after the trigger, or an empty stage)
    /// or commands are disabled.
    ///
    /// Console lines have no trigger and are not mention-resolved.
    pub fn handle(&self, message: &InboundMessage, surface: Box<dyn ReplySurface>) -> Option<Status> {
        if !self.enabled {
            return None;
        }

        let invocation = Invocation {
            origin: message.origin,
            author_id: message.author_id,
            guild_id: message.guild_id,
            used_mention: false,
        };

        if message.origin == Origin::Console {
            return self.execute_line(message.content.trim(), invocation, surface);
        }

        let trigger = self.resolver.detect(&message.content)?;
        let line = self.resolver.resolve(&message.content, trigger)?;
        let invocation = invocation.with_mention(trigger == Trigger::Mention);
        self.execute_line(&line, invocation, surface)
    }

    /// Tokenize and run an already-resolved command line.
    pub fn execute_line(
        &self,
        line: &str,
        invocation: Invocation,
        surface: Box<dyn ReplySurface>,
    ) -> Option<Status> {
        let Some(mut ctx) = CommandContext::from_line(line, invocation, surface) else {
            tracing::debug!(origin = %invocation.origin, "input holds no command");
            return None;
        };

        let status = self.dispatcher().run_pipeline(&mut ctx);
        tracing::debug!(
            origin = %invocation.origin,
            user = invocation.author_id,
            %status,
            "command line finished"
        );

        if status == Status::NotFound && invocation.origin == Origin::Console {
            ctx.warn(&self.messages.cmd_not_found);
        }
        Some(status)
    }
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("registry", &self.registry)
            .field("permissions", &self.permissions.name())
            .field("owner", &self.owner.owner_id())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

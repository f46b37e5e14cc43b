//! Dispatcher and pipeline driver.
//!
//! [`Dispatcher::dispatch`] resolves the current frame's prefix, applies the
//! owner/origin/permission gates and invokes the handler. Groups consume the
//! next token and recurse into their children, applying the gates again at
//! each level. [`Dispatcher::run_pipeline`] repeats this for every stage of
//! the chain until one fails or asks to break.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use super::context::CommandContext;
use super::origin::Origin;
use super::registry::{CommandNode, NodeKind, Registry};
use crate::config::Messages;
use crate::security::{OwnerIdentity, PermissionCheck};

/// Outcome of one dispatch. The numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    NotFound = 1,
    Error = 2,
    PermError = 3,
}

impl Status {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Error => "error",
            Self::PermError => "perm_error",
        })
    }
}

/// Borrowed view of everything a dispatch needs. Cheap to build per line.
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    registry: &'a Registry,
    permissions: &'a dyn PermissionCheck,
    owner: &'a dyn OwnerIdentity,
    messages: &'a Messages,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a Registry,
        permissions: &'a dyn PermissionCheck,
        owner: &'a dyn OwnerIdentity,
        messages: &'a Messages,
    ) -> Self {
        Self {
            registry,
            permissions,
            owner,
            messages,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn messages(&self) -> &'a Messages {
        self.messages
    }

    pub fn owner(&self) -> &'a dyn OwnerIdentity {
        self.owner
    }

    /// Whether owner-only gating lets this caller see `node`. Console
    /// callers and the owner see everything.
    pub fn is_visible(&self, node: &CommandNode, ctx: &CommandContext) -> bool {
        !node.origin().is_owner_only()
            || ctx.origin() == Origin::Console
            || self.owner.is_owner(ctx.author_id())
    }

    /// Run every stage of the context's chain in order.
    ///
    /// Stops on the first non-success status, on a break request, or once
    /// the chain is exhausted, and returns the status of the last stage run.
    pub fn run_pipeline(&self, ctx: &mut CommandContext) -> Status {
        loop {
            let status = self.dispatch(ctx);

            if status == Status::Error {
                ctx.notify_failure();
            }
            if !status.is_success() {
                tracing::debug!(stage = ctx.stage(), %status, "pipeline stopped");
                return status;
            }
            if ctx.should_break() {
                tracing::debug!(stage = ctx.stage(), "pipeline break requested");
                return status;
            }
            if !ctx.advance_pipeline() {
                return status;
            }
        }
    }

    /// Dispatch the current frame once.
    pub fn dispatch(&self, ctx: &mut CommandContext) -> Status {
        match self.registry.lookup(ctx.prefix()) {
            Some(node) => self.invoke(node, ctx),
            None => Status::NotFound,
        }
    }

    fn invoke(&self, node: &'a CommandNode, ctx: &mut CommandContext) -> Status {
        if let Some(denied) = self.check_gates(node, ctx) {
            return denied;
        }

        ctx.pull_prefix();

        match &node.kind {
            NodeKind::Group { .. } => {
                if ctx.prefix().is_empty() {
                    return Status::Success;
                }
                match self.registry.child(node, ctx.prefix()) {
                    Some(child) => self.invoke(child, ctx),
                    None => Status::NotFound,
                }
            }
            NodeKind::Leaf(leaf) => {
                let handler = &leaf.handler;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx, self)));
                match outcome {
                    Ok(Ok(())) => Status::Success,
                    Ok(Err(e)) => {
                        tracing::error!(command = node.path(), error = %format!("{e:#}"), "command failed");
                        Status::Error
                    }
                    Err(payload) => {
                        tracing::error!(
                            command = node.path(),
                            panic = panic_message(payload.as_ref()),
                            "command panicked"
                        );
                        Status::Error
                    }
                }
            }
        }
    }

    /// `Some(status)` when the caller may not run `node`.
    fn check_gates(&self, node: &CommandNode, ctx: &mut CommandContext) -> Option<Status> {
        if !self.is_visible(node, ctx) {
            tracing::debug!(command = node.path(), user = ctx.author_id(), "owner-only command hidden");
            return Some(Status::NotFound);
        }

        let origin = ctx.origin();
        if !node.origin().allows(origin) {
            tracing::debug!(command = node.path(), %origin, allowed = %node.origin(), "origin denied");
            let text = match origin {
                Origin::Console => &self.messages.no_console,
                Origin::Private => &self.messages.no_private,
                Origin::Guild => &self.messages.no_server,
            };
            ctx.warn(text);
            return Some(Status::PermError);
        }

        if origin == Origin::Guild {
            let guild_id = ctx.guild_id().unwrap_or_default();
            let user_id = ctx.author_id();
            for permission in node.permissions() {
                if !self.permissions.has_permission(guild_id, user_id, permission) {
                    tracing::debug!(
                        command = node.path(),
                        permission = %permission,
                        checker = self.permissions.name(),
                        "permission denied"
                    );
                    ctx.warn(&self.messages.no_perm_for(permission));
                    return Some(Status::PermError);
                }
            }
        }

        None
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

//! Collaborator traits consumed by the command dispatcher.
//!
//! The engine never stores or evaluates permission grants itself. It asks a
//! [`PermissionCheck`] implementation whether a guild member holds a dotted
//! permission path, and an [`OwnerIdentity`] whether a caller is the bot
//! owner. Both are synchronous; an implementation backed by a database
//! round trip is responsible for its own caching and timeouts.

/// Fine-grained permission lookup.
///
/// Consulted only for guild invocations of commands that declare
/// permission strings. Implementations must be `Send + Sync` because one
/// checker is shared by every dispatch on the runtime.
pub trait PermissionCheck: Send + Sync {
    /// Whether `user_id` holds `permission` in `guild_id`.
    ///
    /// `permission` is a validated dotted lowercase path such as
    /// `music.play`, `music.*` or `*`.
    fn has_permission(&self, guild_id: u64, user_id: u64, permission: &str) -> bool;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str;
}

/// Bot owner identity.
pub trait OwnerIdentity: Send + Sync {
    fn owner_id(&self) -> u64;

    fn is_owner(&self, user_id: u64) -> bool {
        user_id == self.owner_id()
    }
}

/// Grants every permission. The default when no grant store is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn has_permission(&self, _guild_id: u64, _user_id: u64, _permission: &str) -> bool {
        true
    }

    fn name(&self) -> &str {
        "allow-all"
    }
}

/// Denies every permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionCheck for DenyAll {
    fn has_permission(&self, _guild_id: u64, _user_id: u64, _permission: &str) -> bool {
        false
    }

    fn name(&self) -> &str {
        "deny-all"
    }
}

/// Owner read from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredOwner(pub u64);

impl OwnerIdentity for ConfiguredOwner {
    fn owner_id(&self) -> u64 {
        self.0
    }
}

//! Access-control collaborators for command dispatch.
//!
//! [`PermissionCheck`] and [`OwnerIdentity`] are the narrow interfaces the
//! dispatcher consults before invoking a handler. Declared permission paths
//! are validated once, at registry build time, with [`is_permission_path`].

pub mod traits;

use std::sync::LazyLock;

use regex::Regex;

pub use traits::{AllowAll, ConfiguredOwner, DenyAll, OwnerIdentity, PermissionCheck};

static PERMISSION_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(([a-z]+(\.[a-z]+)*(\.\*)?)|\*)$").ok());

/// Whether `path` is a well-formed permission path: dotted lowercase
/// segments with an optional trailing `.*`, or a lone `*`.
pub fn is_permission_path(path: &str) -> bool {
    PERMISSION_PATH
        .as_ref()
        .is_some_and(|re| re.is_match(path))
}

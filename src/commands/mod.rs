//! Text-command routing: from a raw chat line to executed handlers.
//!
//! Data flows through the submodules in order: [`mention`] strips the
//! trigger and rewrites mentions, [`frame`] tokenizes into a frame chain,
//! [`context`] wraps the chain in a cursor, and [`dispatch`] walks the
//! [`registry`] once per pipeline stage. [`engine`] ties it together for
//! inbound messages; [`builtin`] holds the commands every bot ships with.

pub mod builtin;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod frame;
pub mod mention;
pub mod origin;
pub mod registry;

pub use builtin::register_builtins;
pub use context::{ArgError, CommandContext, ContextFlags, Invocation, PIPE_INPUT};
pub use dispatch::{Dispatcher, Status};
pub use engine::CommandEngine;
pub use frame::{extract_frames, Frame, FrameChain};
pub use mention::{rewrite_mentions, MentionResolver, Trigger};
pub use origin::{Origin, OriginMask};
pub use registry::{
    CommandDecl, CommandHandler, CommandNode, GroupDecl, Registry, RegistryBuilder, RegistryError,
};

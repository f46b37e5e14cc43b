pub mod capture;
pub mod console;
pub mod traits;

pub use capture::{CaptureSurface, CapturedReply, ReplyKind};
pub use console::{ConsoleChannel, ConsoleReply};
pub use traits::{Channel, InboundMessage, ReplySurface};

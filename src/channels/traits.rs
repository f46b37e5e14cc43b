use async_trait::async_trait;

use crate::commands::Origin;

/// A line of text received from some surface, addressed to the bot or not.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub origin: Origin,
    pub author_id: u64,
    /// Set only for guild messages
    pub guild_id: Option<u64>,
    pub content: String,
    pub timestamp: u64,
}

/// Where a command's replies go. The engine never formats beyond plain
/// strings; surfaces decide how `info`/`warn`/`error` look.
pub trait ReplySurface: Send {
    /// Send plain text back to the invoker
    fn reply(&self, text: &str);

    fn info(&self, text: &str) {
        self.reply(text);
    }

    /// Warning reply (permission denial, bad usage)
    fn warn(&self, text: &str);

    fn error(&self, text: &str) {
        self.warn(text);
    }

    /// Signal that the command failed with an internal error.
    fn notify_failure(&self) {}
}

/// A source of inbound command lines
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name
    fn name(&self) -> &str;

    /// Reply surface for a message received on this channel
    fn surface_for(&self, message: &InboundMessage) -> Box<dyn ReplySurface>;

    /// Start listening for incoming messages (long-running)
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;
}

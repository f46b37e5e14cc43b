use super::traits::{Channel, InboundMessage, ReplySurface};
use crate::commands::Origin;
use anyhow::Context;
use async_trait::async_trait;
use std::io::BufRead;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Operator console: stdin in, stdout/stderr out
pub struct ConsoleChannel {
    operator_id: u64,
}

/// What one console line asks for.
enum ConsoleLine {
    Skip,
    Quit,
    Message(InboundMessage),
}

impl ConsoleChannel {
    /// `operator_id` is reported as the author of every console line.
    pub fn new(operator_id: u64) -> Self {
        Self { operator_id }
    }

    fn classify(&self, line: &str) -> ConsoleLine {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleLine::Skip;
        }
        if line == "/quit" || line == "/exit" {
            return ConsoleLine::Quit;
        }

        ConsoleLine::Message(InboundMessage {
            id: Uuid::new_v4().to_string(),
            origin: Origin::Console,
            author_id: self.operator_id,
            guild_id: None,
            content: line.to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        })
    }

    /// Forward trimmed, non-empty lines from `reader` until EOF, `/quit`,
    /// `/exit`, or the receiver is dropped.
    pub async fn forward_lines<R>(
        &self,
        reader: R,
        tx: mpsc::Sender<InboundMessage>,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            match self.classify(&line) {
                ConsoleLine::Skip => {}
                ConsoleLine::Quit => break,
                ConsoleLine::Message(msg) => {
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Like [`forward_lines`](Self::forward_lines), fed from a line receiver.
    async fn forward_received(
        &self,
        mut lines: mpsc::UnboundedReceiver<String>,
        tx: mpsc::Sender<InboundMessage>,
    ) {
        while let Some(line) = lines.recv().await {
            match self.classify(&line) {
                ConsoleLine::Skip => {}
                ConsoleLine::Quit => break,
                ConsoleLine::Message(msg) => {
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Blocking reader loop. Runs on its own thread so an unfinished read never
/// holds up runtime shutdown; the thread ends with the process.
fn pump_lines<R: BufRead>(reader: R, tx: &mpsc::UnboundedSender<String>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if tx.send(line).is_err() {
            break;
        }
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn surface_for(&self, _message: &InboundMessage) -> Box<dyn ReplySurface> {
        Box::new(ConsoleReply)
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("console-stdin".into())
            .spawn(move || pump_lines(std::io::stdin().lock(), &line_tx))
            .context("failed to spawn console reader")?;
        self.forward_received(line_rx, tx).await;
        Ok(())
    }
}

/// Prints replies to stdout and warnings to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReply;

impl ReplySurface for ConsoleReply {
    fn reply(&self, text: &str) {
        println!("{text}");
    }

    fn warn(&self, text: &str) {
        eprintln!("warning: {text}");
    }

    fn error(&self, text: &str) {
        eprintln!("error: {text}");
    }

    fn notify_failure(&self) {
        eprintln!("error: the command failed, see the log for details");
    }
}

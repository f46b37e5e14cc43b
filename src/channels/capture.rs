//! In-memory reply surface.
//!
//! Collects every reply instead of sending it anywhere. Clones share the
//! same buffer, so a caller can hand a boxed clone to the engine and read
//! the replies back afterwards.

use std::sync::Arc;

use parking_lot::Mutex;

use super::traits::ReplySurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Reply,
    Info,
    Warn,
    Error,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedReply {
    pub kind: ReplyKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureSurface {
    replies: Arc<Mutex<Vec<CapturedReply>>>,
}

impl CaptureSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed handle sharing this buffer.
    pub fn boxed(&self) -> Box<dyn ReplySurface> {
        Box::new(self.clone())
    }

    pub fn replies(&self) -> Vec<CapturedReply> {
        self.replies.lock().clone()
    }

    /// Texts of every reply, in order, failure markers excluded.
    pub fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .iter()
            .filter(|r| r.kind != ReplyKind::Failure)
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn of_kind(&self, kind: ReplyKind) -> Vec<String> {
        self.replies
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.of_kind(ReplyKind::Failure).len()
    }

    pub fn clear(&self) {
        self.replies.lock().clear();
    }

    fn push(&self, kind: ReplyKind, text: &str) {
        self.replies.lock().push(CapturedReply {
            kind,
            text: text.to_string(),
        });
    }
}

impl ReplySurface for CaptureSurface {
    fn reply(&self, text: &str) {
        self.push(ReplyKind::Reply, text);
    }

    fn info(&self, text: &str) {
        self.push(ReplyKind::Info, text);
    }

    fn warn(&self, text: &str) {
        self.push(ReplyKind::Warn, text);
    }

    fn error(&self, text: &str) {
        self.push(ReplyKind::Error, text);
    }

    fn notify_failure(&self) {
        self.push(ReplyKind::Failure, "");
    }
}

//! Command context: a cursor over one input line's frame chain.
//!
//! The context is created once per input line and threaded through every
//! pipeline stage. It owns the current frame, the queued stages, the pipe
//! buffers carrying text from one stage to the next, and per-stage flags.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::frame::{extract_frames, Frame, FrameChain};
use super::origin::Origin;
use crate::channels::ReplySurface;

/// Argument index meaning "parse the pipe input instead of a positional
/// argument".
pub const PIPE_INPUT: usize = usize::MAX;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing argument #{0}")]
    Missing(usize),
    #[error("no piped input")]
    NoPipeInput,
    #[error("\"{value}\" is not a valid {kind}")]
    Invalid { value: String, kind: &'static str },
}

/// Per-stage control flags, reset on every pipeline advance.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFlags(u8);

impl ContextFlags {
    pub const NONE: Self = Self(0);
    /// Stop the pipeline after the current stage
    pub const BREAK_PIPELINE: Self = Self(1 << 0);
    /// Turn any warning/error reply into a pipeline break
    pub const BREAK_ON_WARNING: Self = Self(1 << 1);

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ContextFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextFlags")
            .field("break_pipeline", &self.contains(Self::BREAK_PIPELINE))
            .field("break_on_warning", &self.contains(Self::BREAK_ON_WARNING))
            .finish()
    }
}

/// Who invoked the command and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub origin: Origin,
    pub author_id: u64,
    pub guild_id: Option<u64>,
    /// Whether the bot was addressed by mention rather than by tag
    pub used_mention: bool,
}

impl Invocation {
    pub fn console(author_id: u64) -> Self {
        Self {
            origin: Origin::Console,
            author_id,
            guild_id: None,
            used_mention: false,
        }
    }

    pub fn private(author_id: u64) -> Self {
        Self {
            origin: Origin::Private,
            author_id,
            guild_id: None,
            used_mention: false,
        }
    }

    pub fn guild(guild_id: u64, author_id: u64) -> Self {
        Self {
            origin: Origin::Guild,
            author_id,
            guild_id: Some(guild_id),
            used_mention: false,
        }
    }

    pub fn with_mention(mut self, used_mention: bool) -> Self {
        self.used_mention = used_mention;
        self
    }
}

pub struct CommandContext {
    current: Frame,
    queue: Vec<Frame>,
    queue_index: usize,
    pipe_in: Option<String>,
    pipe_out: Option<String>,
    flags: ContextFlags,
    invocation: Invocation,
    surface: Box<dyn ReplySurface>,
}

impl CommandContext {
    pub fn new(chain: FrameChain, invocation: Invocation, surface: Box<dyn ReplySurface>) -> Self {
        let piped = chain.len() > 1;
        let (current, queue) = chain.into_parts();
        Self {
            current,
            queue,
            queue_index: 0,
            pipe_in: piped.then(String::new),
            pipe_out: piped.then(String::new),
            flags: ContextFlags::NONE,
            invocation,
            surface,
        }
    }

    /// Tokenize `line` and build a context, or `None` if it holds no command.
    pub fn from_line(
        line: &str,
        invocation: Invocation,
        surface: Box<dyn ReplySurface>,
    ) -> Option<Self> {
        extract_frames(line).map(|chain| Self::new(chain, invocation, surface))
    }

    // ── Cursor ──────────────────────────────────────────────────────

    /// First token of the current frame, or `""` once every token was pulled.
    pub fn prefix(&self) -> &str {
        self.current.args.first().map_or("", String::as_str)
    }

    /// Consume the first token of the current frame.
    pub fn pull_prefix(&mut self) -> &mut Self {
        self.current.shift();
        self
    }

    pub fn args(&self) -> &[String] {
        &self.current.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.current.args.get(index).map(String::as_str)
    }

    pub fn argc(&self) -> usize {
        self.current.args.len()
    }

    pub fn line_breaks(&self) -> &[usize] {
        &self.current.line_breaks
    }

    /// Arguments grouped by the input lines they appeared on. Blank lines
    /// produce no group.
    pub fn lines(&self) -> Vec<&[String]> {
        let args = &self.current.args;
        let mut lines = Vec::new();
        let mut start = 0;
        for &lb in &self.current.line_breaks {
            let end = lb.min(args.len());
            if end > start {
                lines.push(&args[start..end]);
                start = end;
            }
        }
        if start < args.len() {
            lines.push(&args[start..]);
        }
        lines
    }

    pub fn join_args(&self, sep: &str) -> String {
        self.current.args.join(sep)
    }

    pub fn join_args_from(&self, start: usize, sep: &str) -> String {
        self.current
            .args
            .get(start..)
            .map(|rest| rest.join(sep))
            .unwrap_or_default()
    }

    // ── Typed getters ───────────────────────────────────────────────

    fn source(&self, index: usize) -> Result<&str, ArgError> {
        if index == PIPE_INPUT {
            return self
                .pipe_in
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(ArgError::NoPipeInput);
        }
        self.arg(index).ok_or(ArgError::Missing(index))
    }

    /// Parse argument `index` (or the pipe input for [`PIPE_INPUT`]).
    pub fn parse<T: FromStr>(&self, index: usize, kind: &'static str) -> Result<T, ArgError> {
        let raw = self.source(index)?;
        raw.parse().map_err(|_| ArgError::Invalid {
            value: raw.to_string(),
            kind,
        })
    }

    pub fn get_i32(&self, index: usize) -> Result<i32, ArgError> {
        self.parse(index, "int")
    }

    pub fn get_i32_or(&self, index: usize, fallback: i32) -> i32 {
        self.get_i32(index).unwrap_or(fallback)
    }

    pub fn get_i64(&self, index: usize) -> Result<i64, ArgError> {
        self.parse(index, "long")
    }

    pub fn get_i64_or(&self, index: usize, fallback: i64) -> i64 {
        self.get_i64(index).unwrap_or(fallback)
    }

    pub fn get_f64(&self, index: usize) -> Result<f64, ArgError> {
        self.parse(index, "double")
    }

    pub fn get_f64_or(&self, index: usize, fallback: f64) -> f64 {
        self.get_f64(index).unwrap_or(fallback)
    }

    pub fn get_f32(&self, index: usize) -> Result<f32, ArgError> {
        self.parse(index, "float")
    }

    pub fn get_f32_or(&self, index: usize, fallback: f32) -> f32 {
        self.get_f32(index).unwrap_or(fallback)
    }

    pub fn get_bool(&self, index: usize) -> Result<bool, ArgError> {
        let raw = self.source(index)?;
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ArgError::Invalid {
                value: raw.to_string(),
                kind: "bool",
            })
        }
    }

    pub fn get_bool_or(&self, index: usize, fallback: bool) -> bool {
        self.get_bool(index).unwrap_or(fallback)
    }

    // ── Pipeline ────────────────────────────────────────────────────

    /// True while queued stages remain.
    pub fn has_pipeline(&self) -> bool {
        self.queue_index < self.queue.len()
    }

    /// Zero-based index of the stage currently executing.
    pub fn stage(&self) -> usize {
        self.queue_index
    }

    /// Move to the next stage. The output of the finished stage becomes the
    /// input of the new one and flags are cleared. Returns `false`, without
    /// touching anything, when no stage is left.
    pub fn advance_pipeline(&mut self) -> bool {
        if !self.has_pipeline() {
            return false;
        }

        self.current = std::mem::take(&mut self.queue[self.queue_index]);
        self.queue_index += 1;

        std::mem::swap(&mut self.pipe_in, &mut self.pipe_out);
        if let Some(out) = self.pipe_out.as_mut() {
            out.clear();
        }
        self.flags = ContextFlags::NONE;
        true
    }

    /// Text written by the previous stage, if this line is piped.
    pub fn pipe_in(&self) -> Option<&str> {
        self.pipe_in.as_deref()
    }

    pub fn pipe_out(&self) -> Option<&str> {
        self.pipe_out.as_deref()
    }

    pub fn pipe_out_mut(&mut self) -> Option<&mut String> {
        self.pipe_out.as_mut()
    }

    /// Splice the pipe input into the arguments, first when `before` is set,
    /// last otherwise. Returns whether anything was inserted.
    pub fn merge_pipe_and_args(&mut self, before: bool) -> bool {
        let Some(input) = self.pipe_in.as_deref().filter(|s| !s.is_empty()) else {
            return false;
        };
        let input = input.to_string();

        if before {
            self.current.args.insert(0, input);
            for lb in &mut self.current.line_breaks {
                *lb += 1;
            }
        } else {
            self.current.args.push(input);
        }
        true
    }

    /// Write stage output: into the pipe while later stages remain,
    /// otherwise straight back to the invoker.
    pub fn output(&mut self, text: &str) {
        if self.has_pipeline() {
            if let Some(out) = self.pipe_out.as_mut() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
                return;
            }
        }
        self.surface.reply(text);
    }

    // ── Flags ───────────────────────────────────────────────────────

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    /// Ask the driver to stop after this stage.
    pub fn break_pipeline(&mut self) {
        self.flags.insert(ContextFlags::BREAK_PIPELINE);
    }

    /// Make any warning or error reply in this stage stop the pipeline.
    pub fn break_on_warning(&mut self) {
        self.flags.insert(ContextFlags::BREAK_ON_WARNING);
    }

    pub fn should_break(&self) -> bool {
        self.flags.contains(ContextFlags::BREAK_PIPELINE)
    }

    // ── Invocation ──────────────────────────────────────────────────

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn origin(&self) -> Origin {
        self.invocation.origin
    }

    pub fn author_id(&self) -> u64 {
        self.invocation.author_id
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.invocation.guild_id
    }

    pub fn used_mention(&self) -> bool {
        self.invocation.used_mention
    }

    // ── Replies ─────────────────────────────────────────────────────

    pub fn reply(&self, text: &str) {
        self.surface.reply(text);
    }

    pub fn info(&self, text: &str) {
        self.surface.info(text);
    }

    pub fn warn(&mut self, text: &str) {
        self.surface.warn(text);
        self.escalate();
    }

    pub fn error(&mut self, text: &str) {
        self.surface.error(text);
        self.escalate();
    }

    pub(crate) fn notify_failure(&self) {
        self.surface.notify_failure();
    }

    fn escalate(&mut self) {
        if self.flags.contains(ContextFlags::BREAK_ON_WARNING) {
            self.flags.insert(ContextFlags::BREAK_PIPELINE);
        }
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("args", &self.current.args)
            .field("stage", &self.queue_index)
            .field("queued", &(self.queue.len() - self.queue_index))
            .field("flags", &self.flags)
            .field("invocation", &self.invocation)
            .finish_non_exhaustive()
    }
}

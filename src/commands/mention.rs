//! Invocation detection and mention rewriting.
//!
//! Chat messages reach the command engine only when they start with the
//! bot's own mention or its configured text tag. The trigger is stripped and
//! platform mention tokens (`<@ID>`, `<@!ID>`, `<#ID>`) are rewritten to the
//! bare numeric id in a single left-to-right pass.
//!
//! Rewriting happens before tokenization, so a mention-shaped literal inside
//! quotes is rewritten too.

/// Number of digits in a platform snowflake id.
pub const ID_LEN: usize = 18;

/// Zero-width space, sometimes inserted by clients after a mention.
const ZWSP: char = '\u{200B}';

/// How a message addressed the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `<@self_id>` or `<@!self_id>`
    Mention,
    /// The configured text tag, e.g. `!`
    Tag,
}

#[derive(Debug, Clone)]
pub struct MentionResolver {
    tag: String,
    mention: String,
    nick_mention: String,
    use_mention: bool,
}

impl MentionResolver {
    pub fn new(tag: impl Into<String>, self_id: u64, use_mention: bool) -> Self {
        Self {
            tag: tag.into(),
            mention: format!("<@{self_id}>"),
            nick_mention: format!("<@!{self_id}>"),
            use_mention,
        }
    }

    /// Decide whether `raw` addresses the bot, and how.
    pub fn detect(&self, raw: &str) -> Option<Trigger> {
        if self.use_mention
            && (raw.starts_with(&self.mention) || raw.starts_with(&self.nick_mention))
        {
            return Some(Trigger::Mention);
        }
        if !self.tag.is_empty() && raw.starts_with(&self.tag) {
            return Some(Trigger::Tag);
        }
        None
    }

    /// Strip the invocation token and following whitespace, then rewrite
    /// mentions. Returns `None` when nothing is left after the trigger, or
    /// when `raw` does not actually start with the trigger.
    pub fn resolve(&self, raw: &str, trigger: Trigger) -> Option<String> {
        let rest = match trigger {
            Trigger::Mention => raw
                .strip_prefix(self.mention.as_str())
                .or_else(|| raw.strip_prefix(self.nick_mention.as_str()))?,
            Trigger::Tag => raw.strip_prefix(self.tag.as_str())?,
        };

        let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ZWSP);
        if rest.is_empty() {
            return None;
        }

        Some(rewrite_mentions(rest))
    }
}

/// Replace every well-formed mention token with its bare id; malformed
/// look-alikes are copied unchanged.
pub fn rewrite_mentions(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some((digits, end)) = match_mention(bytes, i) {
                out.push_str(&text[copied..i]);
                out.push_str(&text[digits..digits + ID_LEN]);
                i = end;
                copied = end;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&text[copied..]);
    out
}

/// Match a mention starting at `start` (which holds `<`). Returns the offset
/// of the id digits and the offset just past the closing `>`.
fn match_mention(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut pos = start + 1;
    match bytes.get(pos)? {
        b'@' => {
            pos += 1;
            if bytes.get(pos) == Some(&b'!') {
                pos += 1;
            }
        }
        b'#' => pos += 1,
        _ => return None,
    }

    let digits = bytes.get(pos..pos + ID_LEN)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.get(pos + ID_LEN) != Some(&b'>') {
        return None;
    }
    Some((pos, pos + ID_LEN + 1))
}

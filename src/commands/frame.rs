//! Frame tokenizer.
//!
//! A raw command line is split into pipeline stages on unquoted, unescaped
//! `|` characters. Each stage becomes a [`Frame`]: its whitespace-separated
//! tokens plus the token indices at which unquoted newlines occurred, so
//! handlers can recover line structure after tokenization.
//!
//! Grammar:
//! - tokens are separated by ASCII whitespace; other spaces such as NBSP stay inside tokens
//! - `\` escapes the next character anywhere (quotes, pipes, backslashes, whitespace)
//! - `"..."` groups text, including whitespace and `|`, into one token
//! - an unterminated quote runs to the end of input and is still emitted
//! - a stage that yields no tokens voids the whole chain

/// One pipeline stage: its arguments and newline markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub(crate) args: Vec<String>,
    pub(crate) line_breaks: Vec<usize>,
}

impl Frame {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// For every newline run outside quotes, the number of tokens that
    /// preceded it. Strictly increasing, each value `<= args().len()`.
    pub fn line_breaks(&self) -> &[usize] {
        &self.line_breaks
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Drop the first token, keeping line markers aligned with the shifted
    /// arguments. Markers at or before the removed token are discarded.
    pub(crate) fn shift(&mut self) {
        if !self.args.is_empty() {
            self.args.remove(0);
        }
        self.line_breaks.retain(|&lb| lb > 1);
        for lb in &mut self.line_breaks {
            *lb -= 1;
        }
    }
}

/// Ordered, never-empty sequence of frames for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameChain {
    frames: Vec<Frame>,
}

impl FrameChain {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &Frame {
        &self.frames[0]
    }

    /// Split into the current frame and the queued pipeline stages.
    pub(crate) fn into_parts(self) -> (Frame, Vec<Frame>) {
        let mut frames = self.frames.into_iter();
        let current = frames.next().unwrap_or_default();
        (current, frames.collect())
    }
}

#[derive(Default)]
struct FrameBuilder {
    args: Vec<String>,
    line_breaks: Vec<usize>,
    token: String,
}

impl FrameBuilder {
    fn flush(&mut self) {
        if !self.token.is_empty() {
            self.args.push(std::mem::take(&mut self.token));
        }
    }

    fn mark_line_break(&mut self) {
        let at = self.args.len();
        if self.line_breaks.last() != Some(&at) {
            self.line_breaks.push(at);
        }
    }

    fn finish(mut self) -> Option<Frame> {
        self.flush();
        if self.args.is_empty() {
            return None;
        }
        Some(Frame {
            args: self.args,
            line_breaks: self.line_breaks,
        })
    }
}

/// Tokenize `input` into a frame chain. Returns `None` when any stage is
/// empty, which callers treat as "no command".
pub fn extract_frames(input: &str) -> Option<FrameChain> {
    let mut frames = Vec::new();
    let mut current = FrameBuilder::default();
    let mut in_quotes = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            current.token.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' => escape_next = true,
            '"' => in_quotes = !in_quotes,
            '|' if !in_quotes => {
                let frame = std::mem::take(&mut current).finish()?;
                frames.push(frame);
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                current.flush();
                if c == '\n' {
                    current.mark_line_break();
                }
            }
            c => current.token.push(c),
        }
    }

    frames.push(current.finish()?);
    Some(FrameChain { frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(chain: &FrameChain, idx: usize) -> Vec<&str> {
        chain.frames()[idx].args().iter().map(String::as_str).collect()
    }

    #[test]
    fn single_word_is_one_frame() {
        let chain = extract_frames("stop").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(args_of(&chain, 0), vec!["stop"]);
        assert!(chain.first().line_breaks().is_empty());
    }

    #[test]
    fn quoted_segment_is_one_token() {
        let chain = extract_frames(r#"echo "a b" c"#).unwrap();
        assert_eq!(args_of(&chain, 0), vec!["echo", "a b", "c"]);
    }

    #[test]
    fn pipes_split_stages_in_order() {
        let chain = extract_frames("a | b | c").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(args_of(&chain, 0), vec!["a"]);
        assert_eq!(args_of(&chain, 1), vec!["b"]);
        assert_eq!(args_of(&chain, 2), vec!["c"]);
    }

    #[test]
    fn pipe_without_spaces_still_splits() {
        let chain = extract_frames("echo hi|text upper").unwrap();
        assert_eq!(args_of(&chain, 0), vec!["echo", "hi"]);
        assert_eq!(args_of(&chain, 1), vec!["text", "upper"]);
    }

    #[test]
    fn quoted_and_escaped_pipes_are_literal() {
        let chain = extract_frames(r#"echo "a|b" c\|d"#).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(args_of(&chain, 0), vec!["echo", "a|b", "c|d"]);
    }

    #[test]
    fn backslash_escapes_quote_backslash_and_space() {
        let chain = extract_frames(r#"say \"hi\" a\\b one\ token"#).unwrap();
        assert_eq!(
            args_of(&chain, 0),
            vec!["say", "\"hi\"", r"a\b", "one token"]
        );
    }

    #[test]
    fn repeated_whitespace_produces_no_empty_tokens() {
        let chain = extract_frames("  a \t  b   ").unwrap();
        assert_eq!(args_of(&chain, 0), vec!["a", "b"]);
    }

    #[test]
    fn newlines_record_line_breaks_once_per_run() {
        let chain = extract_frames("a b\nc\n\n\nd e\n").unwrap();
        let frame = chain.first();
        assert_eq!(frame.args().len(), 5);
        assert_eq!(frame.line_breaks(), &[2, 3, 5]);
    }

    #[test]
    fn newline_inside_quotes_is_literal() {
        let chain = extract_frames("note \"line1\nline2\"").unwrap();
        assert_eq!(args_of(&chain, 0), vec!["note", "line1\nline2"]);
        assert!(chain.first().line_breaks().is_empty());
    }

    #[test]
    fn line_breaks_are_strictly_increasing_and_bounded() {
        let chain = extract_frames("\n\na\n b \n\n c d\n\n").unwrap();
        let frame = chain.first();
        let lbs = frame.line_breaks();
        assert!(lbs.windows(2).all(|w| w[0] < w[1]));
        assert!(lbs.iter().all(|&lb| lb <= frame.args().len()));
    }

    #[test]
    fn unterminated_quote_is_emitted() {
        let chain = extract_frames(r#"echo "never closed"#).unwrap();
        assert_eq!(args_of(&chain, 0), vec!["echo", "never closed"]);
    }

    #[test]
    fn empty_and_blank_inputs_yield_no_chain() {
        assert!(extract_frames("").is_none());
        assert!(extract_frames("   \n\t ").is_none());
        assert!(extract_frames("\"\"").is_none());
    }

    #[test]
    fn any_empty_stage_voids_the_chain() {
        assert!(extract_frames("a | | b").is_none());
        assert!(extract_frames("| a").is_none());
        assert!(extract_frames("a |").is_none());
    }

    #[test]
    fn rejoining_plain_input_round_trips() {
        for input in ["help", "echo hello world", "perm grant 123 music.play"] {
            let chain = extract_frames(input).unwrap();
            assert_eq!(chain.first().args().join(" "), input);
        }
    }

    #[test]
    fn only_ascii_whitespace_separates_tokens() {
        let chain = extract_frames("echo a\u{00A0}b\tc").unwrap();
        assert_eq!(args_of(&chain, 0), vec!["echo", "a\u{00A0}b", "c"]);
    }

    #[test]
    fn shift_drops_token_and_realigns_line_breaks() {
        let mut frame = extract_frames("a\nb c\nd").unwrap().first().clone();
        assert_eq!(frame.line_breaks(), &[1, 3]);
        frame.shift();
        assert_eq!(frame.args(), &["b", "c", "d"]);
        assert_eq!(frame.line_breaks(), &[2]);
        frame.shift();
        frame.shift();
        assert_eq!(frame.args(), &["d"]);
        assert!(frame.line_breaks().is_empty());
        frame.shift();
        frame.shift();
        assert!(frame.is_empty());
    }
}

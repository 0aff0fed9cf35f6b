/// Append-only text buffer bounded by a character count.
///
/// When an append pushes the buffer past its cap, characters are dropped
/// from the front so the most recent text is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    text: String,
    chars: usize,
    cap: usize,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            cap,
        }
    }

    /// Append a line followed by a newline.
    pub fn append_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.chars += line.chars().count() + 1;
        self.trim_front();
    }

    /// Replace the whole buffer, keeping at most `cap` trailing characters.
    pub fn replace(&mut self, text: &str) {
        let kept = char_suffix(text, self.cap);
        self.text = kept.to_string();
        self.chars = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.chars = 0;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters (not bytes).
    pub fn len_chars(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn trim_front(&mut self) {
        if self.chars <= self.cap {
            return;
        }
        let excess = self.chars - self.cap;
        let cut = self
            .text
            .char_indices()
            .nth(excess)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len());
        self.text.drain(..cut);
        self.chars = self.cap;
    }
}

/// The last `limit` characters of `text`.
pub(crate) fn char_suffix(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    match text.char_indices().rev().nth(limit - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Bounded scrollback for one output pane.
///
/// Both the command-output pane and the player-output pane write here; the
/// renderer shows the tail that fits on screen. Old lines are dropped once
/// `max_lines` is exceeded. The last line may be "open" (unterminated), in
/// which case further appends extend it.
#[derive(Debug)]
pub struct OutputLog {
    lines: Vec<String>,
    open: bool,
    max_lines: usize,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new(500)
    }
}

impl OutputLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Vec::new(),
            open: false,
            max_lines: max_lines.max(1),
        }
    }

    /// Write `text` and terminate the line. If a line is open, the first
    /// part completes it. Embedded newlines split into multiple lines.
    pub fn line<S: Into<String>>(&mut self, text: S) {
        self.write(&text.into());
        self.open = false;
    }

    /// Write `text` leaving the final line open for further appends.
    pub fn append(&mut self, text: &str) {
        self.write(text);
        self.open = true;
    }

    /// Append a single character to the open line.
    pub fn push_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.append(ch.encode_utf8(&mut buf));
    }

    /// The last `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> &[String] {
        let start = self.lines.len().saturating_sub(count);
        &self.lines[start..]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn write(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            match self.lines.last_mut() {
                Some(last) if self.open => last.push_str(first),
                _ => self.lines.push(first.to_string()),
            }
        }
        for part in parts {
            self.lines.push(part.to_string());
        }
        self.trim();
    }

    fn trim(&mut self) {
        if self.lines.len() > self.max_lines {
            let excess = self.lines.len() - self.max_lines;
            self.lines.drain(..excess);
        }
    }
}

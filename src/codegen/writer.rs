//! Indent-aware string builder for Python code generation.
//!
//! Generated bots use 4-space indentation.

/// Indent-aware string builder that produces Python source code.
pub struct CodeWriter {
    buf: String,
    indent_level: usize,
    /// True if the current line has not yet been written to.
    at_line_start: bool,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(1024),
            indent_level: 0,
            at_line_start: true,
        }
    }

    /// Write a complete line (appends newline).
    pub fn line(&mut self, text: &str) {
        self.write_indent();
        self.buf.push_str(text);
        self.buf.push('\n');
        self.at_line_start = true;
    }

    /// Write every line of `text` at the current indent. Blank lines stay blank.
    pub fn lines(&mut self, text: &str) {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
    }

    /// Write an empty line.
    pub fn blank(&mut self) {
        self.buf.push('\n');
        self.at_line_start = true;
    }

    /// Increase indent by one level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indent by one level.
    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write `text:` and increase indent (e.g. `if x:`).
    pub fn block_open(&mut self, text: &str) {
        self.line(&format!("{}:", text));
        self.indent();
    }

    /// Close the innermost block.
    pub fn block_close(&mut self) {
        self.dedent();
    }

    /// Consume the writer and return the generated string.
    pub fn finish(self) -> String {
        self.buf
    }

    fn write_indent(&mut self) {
        if self.at_line_start && self.indent_level > 0 {
            for _ in 0..self.indent_level {
                self.buf.push_str("    ");
            }
        }
        self.at_line_start = false;
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

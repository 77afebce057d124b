//! Indentation-aware text buffer for generated source.

/// Accumulates generated lines at the current indentation level.
#[derive(Debug, Clone)]
pub struct SourceWriter {
    indent_size: usize,
    indent: usize,
    output: String,
}

impl Default for SourceWriter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl SourceWriter {
    pub fn new(indent_size: usize) -> Self {
        Self {
            indent_size,
            indent: 0,
            output: String::new(),
        }
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            self.output
                .push_str(&" ".repeat(self.indent * self.indent_size));
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    /// Write a line with no indentation (access specifiers, labels).
    pub fn raw_line(&mut self, text: impl AsRef<str>) {
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    /// Blank line, collapsing runs.
    pub fn blank(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }

    /// Append pre-rendered text verbatim.
    pub fn append(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// `open {`, indented body, `}` + `close`.
    pub fn block(&mut self, open: &str, close: &str, body: impl FnOnce(&mut Self)) {
        self.line(format!("{} {{", open));
        self.indent();
        body(self);
        self.dedent();
        self.line(format!("}}{}", close));
    }

    pub fn finish(self) -> String {
        self.output
    }
}

//! Compile and runtime errors
//!
//! Both kinds carry an exception type name (`ename`), a message (`evalue`)
//! and can render a traceback in the familiar layout.

use std::fmt;
use thiserror::Error;

/// File name shown in tracebacks.
pub const INPUT_NAME: &str = "<kernel-input>";

/// What went wrong while compiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Source does not parse
    Syntax,
    /// An integer literal does not fit
    Overflow,
    /// A string literal has a malformed escape
    Value,
    /// The source contains a NUL byte
    Type,
    /// Nesting exceeds the parser's limit
    Memory,
}

impl CompileErrorKind {
    /// Exception type name reported for this kind
    pub const fn ename(&self) -> &'static str {
        match self {
            CompileErrorKind::Syntax => "SyntaxError",
            CompileErrorKind::Overflow => "OverflowError",
            CompileErrorKind::Value => "ValueError",
            CompileErrorKind::Type => "TypeError",
            CompileErrorKind::Memory => "MemoryError",
        }
    }
}

/// Source could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message} (line {line})", kind.ename())]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// 1-based line of the offending token
    pub line: usize,
    /// 1-based column of the offending token
    pub column: usize,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Shorthand for a syntax error
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(CompileErrorKind::Syntax, message, line, column)
    }

    pub fn ename(&self) -> &'static str {
        self.kind.ename()
    }

    /// Renders the error with the offending line and a caret
    pub fn traceback(&self, source: &str) -> Vec<String> {
        let mut lines = vec![format!("  File \"{}\", line {}\n", INPUT_NAME, self.line)];

        if let Some(text) = source.lines().nth(self.line.saturating_sub(1)) {
            let trimmed = text.trim_start();
            let indent = text.chars().count() - trimmed.chars().count();
            let caret = self.column.saturating_sub(1).saturating_sub(indent);
            lines.push(format!("    {}\n", trimmed.trim_end()));
            lines.push(format!("    {}^\n", " ".repeat(caret)));
        }

        lines.push(format!("{}: {}\n", self.ename(), self.message));
        lines
    }
}

/// An exception raised by running code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct Exception {
    pub ename: String,
    pub message: String,
}

impl Exception {
    pub fn new(ename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ename: ename.into(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new("ValueError", message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new("NameError", format!("name '{}' is not defined", name))
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new("AttributeError", message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new("IndexError", message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new("ZeroDivisionError", message)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new("OverflowError", message)
    }

    pub fn memory_error(message: impl Into<String>) -> Self {
        Self::new("MemoryError", message)
    }

    pub fn eof(message: impl Into<String>) -> Self {
        Self::new("EOFError", message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("RuntimeError", message)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.ename)
        } else {
            write!(f, "{}: {}", self.ename, self.message)
        }
    }
}

/// An exception that escaped a program, with its location
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{exception} (line {line})")]
pub struct RuntimeError {
    pub exception: Exception,
    /// 1-based line of the statement that raised
    pub line: usize,
    /// Text of that line, trimmed
    pub source_line: String,
}

impl RuntimeError {
    pub fn ename(&self) -> &str {
        &self.exception.ename
    }

    pub fn evalue(&self) -> &str {
        &self.exception.message
    }

    /// Renders the traceback one chunk per entry
    pub fn traceback(&self) -> Vec<String> {
        let mut lines = vec![
            "Traceback (most recent call last):\n".to_string(),
            format!("  File \"{}\", line {}, in <module>\n", INPUT_NAME, self.line),
        ];
        if !self.source_line.is_empty() {
            lines.push(format!("    {}\n", self.source_line));
        }
        lines.push(format!("{}\n", self.exception));
        lines
    }
}

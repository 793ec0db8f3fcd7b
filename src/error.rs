//! Error taxonomy and the per-compilation diagnostics log.
//!
//! Parsers report failures through [`AsmError`]; user-visible messages are
//! collected into a [`Diagnostics`] log in source order and never unwind a
//! compilation. A failed statement poisons its device build, sibling devices
//! proceed.

use thiserror::Error;

/// An error raised by the assembler core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AsmError {
    /// Malformed numeric literal, bad register syntax, unterminated bracketed
    /// range, garbage trailing characters.
    #[error("{0}")]
    Parse(String),
    /// Numeric out-of-range, register index out of pool, alignment violation,
    /// wrong register count.
    #[error("{0}")]
    Range(String),
    /// Cross-encoding modifier mixing, illegal inline literal, unknown
    /// register or modifier name, missing required argument.
    #[error("{0}")]
    Semantic(String),
    /// Unresolved expression in a place that only accepts inline constants.
    #[error("{0}")]
    Dependency(String),
    /// Pass-through from an external writer.
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for AsmError {
    fn from(err: std::io::Error) -> Self {
        AsmError::Io(err.to_string())
    }
}

/// Severity of a [`Diagnostic`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Suppressible advisory.
    Warning,
    /// Failure of the enclosing statement.
    Error,
}

/// One entry of the compilation log, pinned to a source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: usize,
    /// 1-based source column.
    pub column: usize,
    /// Warning or error.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

/// Accumulates diagnostics for a single compilation, in source order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    warnings_enabled: bool,
}

impl Diagnostics {
    /// Creates an empty log. `warnings_enabled` mirrors the `-w` option.
    pub fn new(warnings_enabled: bool) -> Self {
        Diagnostics {
            entries: Vec::new(),
            warnings_enabled,
        }
    }

    /// Records an error message at the given source position.
    pub fn error(&mut self, line: usize, column: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            line,
            column,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    /// Records a warning. Dropped entirely when warnings are disabled.
    pub fn warning(&mut self, line: usize, column: usize, message: impl Into<String>) {
        if self.warnings_enabled {
            self.entries.push(Diagnostic {
                line,
                column,
                severity: Severity::Warning,
                message: message.into(),
            });
        }
    }

    /// True if any error entry has been recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// The first recorded error, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.entries
            .iter()
            .find(|d| d.severity == Severity::Error)
    }

    /// All recorded entries in source order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Renders the log the way the driver stores it in a program record.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            let kind = match d.severity {
                Severity::Warning => "Warning",
                Severity::Error => "Error",
            };
            out.push_str(&format!("{}:{}: {}: {}\n", d.line, d.column, kind, d.message));
        }
        out
    }
}

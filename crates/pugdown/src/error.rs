//! Error types for the transform pipeline.
//!
//! Template compilation errors originate in the compiler backend and are
//! carried through unmodified. The pipeline never wraps, retries, or
//! swallows them.

use std::fmt;

/// A template compilation error reported by a [`TemplateCompiler`] backend.
///
/// Carries the file name and position when the backend provides them, so the
/// host build tool can surface an accurate location.
///
/// [`TemplateCompiler`]: crate::compiler::TemplateCompiler
#[derive(Debug, Clone)]
pub struct CompileError {
    /// The error message
    pub message: String,
    /// File path where the error occurred
    pub file: Option<String>,
    /// Line number (1-indexed)
    pub line: Option<usize>,
    /// Column number (1-indexed)
    pub column: Option<usize>,
}

impl CompileError {
    /// Create a new compile error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Add file information
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Add line and column information
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref file) = self.file {
            write!(f, "\n  in {}", file)?;
        }

        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "\n  at line {}, column {}", line, col)?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Errors produced by the transform pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum PugError {
    /// A compilation error from the template compiler, propagated verbatim.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// An include/exclude glob or static pattern failed to compile.
    #[error("invalid {kind} pattern `{pattern}`")]
    Pattern {
        /// Which option the pattern came from ("include", "exclude", ...)
        kind: &'static str,
        /// The offending pattern text
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The emitted module could not be serialized.
    #[error("failed to serialize emitted module")]
    Emit(#[from] serde_json::Error),
}

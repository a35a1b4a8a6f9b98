//! The seam between the pipeline and the template compiler backend.
//!
//! The pipeline does not implement the template language. It drives a
//! [`TemplateCompiler`] through the two entry points the transform needs:
//! render-now for static templates and compile-to-function for everything
//! else. Backends are synchronous, side-effect-free black boxes; the only
//! thing they may do besides returning output is fail with a
//! [`CompileError`], which the pipeline propagates unmodified.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::options::Pretty;

/// The value mapping passed to a template at render time.
pub type Locals = serde_json::Map<String, serde_json::Value>;

/// The named filter registry handed to the compiler.
pub type Filters = FxHashMap<String, Arc<dyn TemplateFilter>>;

/// A named text filter templates can pipe block content through.
pub trait TemplateFilter: Send + Sync {
    /// Transform the filtered block. `options` carries the attributes the
    /// template wrote on the filter invocation.
    fn apply(&self, content: &str, options: &Locals) -> Result<String, CompileError>;
}

/// Compiler options for one template file.
///
/// An explicit copy of the compiler-relevant configuration fields plus the
/// current file name, owned by a single transform invocation. Built by
/// [`Config::compile_options`](crate::options::Config::compile_options).
#[derive(Clone)]
pub struct CompileOptions {
    /// Path of the template being compiled, used for error reporting and
    /// include resolution
    pub filename: String,
    /// Root directory for absolute includes and extends
    pub basedir: Option<PathBuf>,
    /// Doctype shorthand
    pub doctype: String,
    /// Whitespace handling
    pub pretty: Pretty,
    /// Named text filters
    pub filters: Filters,
    /// Hold locals in a `self` namespace object
    pub use_self: bool,
    /// Print the compiler's token stream and AST
    pub debug: bool,
    /// Emit debug instrumentation into the compiled function
    pub compile_debug: bool,
    /// Ambient identifiers templates may reference
    pub globals: Vec<String>,
    /// Inline runtime helpers instead of referencing the shared namespace
    pub inline_runtime_functions: bool,
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("filename", &self.filename)
            .field("basedir", &self.basedir)
            .field("doctype", &self.doctype)
            .field("pretty", &self.pretty)
            .field("filters_count", &self.filters.len())
            .field("use_self", &self.use_self)
            .field("debug", &self.debug)
            .field("compile_debug", &self.compile_debug)
            .field("globals", &self.globals)
            .field("inline_runtime_functions", &self.inline_runtime_functions)
            .finish()
    }
}

/// Output of a build-time render: the finished markup plus the template
/// files the render pulled in through includes and extends.
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    /// The rendered markup
    pub html: String,
    /// Paths of included/extended templates, possibly with duplicates
    pub dependencies: Vec<String>,
}

/// Output of a client compile: the text of a standalone template function
/// plus the tracked include dependencies.
#[derive(Debug, Clone)]
pub struct ClientTemplate {
    /// The compiled function source. Contains exactly one top-level
    /// `function template(` declaration. With `compile_debug` set, the body
    /// carries `;pug_debug_line = N;` (and `pug_debug_filename = "...";`)
    /// instrumentation lines, and runtime helper calls go through the
    /// `pug.` namespace prefix.
    pub body: String,
    /// Paths of included/extended templates, possibly with duplicates
    pub dependencies: Vec<String>,
}

/// A template compiler backend.
pub trait TemplateCompiler: Send + Sync {
    /// Compile `source` and execute it immediately against `locals`,
    /// returning the rendered markup. Used for static templates; the
    /// template's textual result is all that ships in the bundle.
    fn render(
        &self,
        source: &str,
        options: &CompileOptions,
        locals: &Locals,
    ) -> Result<RenderedTemplate, CompileError>;

    /// Compile `source` to a standalone client function with tracked
    /// dependencies. Used for runtime templates.
    fn compile_client(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<ClientTemplate, CompileError>;
}

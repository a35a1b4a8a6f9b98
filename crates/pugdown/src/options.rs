//! Plugin options and resolved configuration.
//!
//! Options resolve in two explicit phases. [`parse_options`] is pure: it
//! merges user options with defaults and produces an immutable [`Config`].
//! [`Config::bind`] runs once, before any transform, to fill in a base
//! directory that was not supplied up front. After that the configuration is
//! only read, so overlapping transforms share it by reference.

use std::path::{Path, PathBuf};

use bon::Builder;
use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;
use serde_json::Value;

use crate::compiler::{CompileOptions, Filters, Locals};

/// Module specifier used for the bundled runtime import.
///
/// The leading `\0` marks the id as plugin-internal, following the host
/// bundler convention for virtual modules.
pub const RUNTIME_IMPORT: &str = "\0pug-runtime";

/// Ambient identifier names every template may reference.
const DEFAULT_GLOBALS: [&str; 8] = [
    "String", "Number", "Boolean", "Date", "Array", "Function", "Math", "RegExp",
];

static DEFAULT_STATIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.static\.(?:pug|jade)$").unwrap());

/// Whitespace handling passed through to the compiler.
///
/// Deprecated upstream; kept for templates that still rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Pretty {
    /// Compact output (the default)
    #[default]
    Off,
    /// Indent with the compiler's default indentation
    On,
    /// Indent with a custom string
    Indent(String),
}

/// Where the shared runtime helpers come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PugRuntime {
    /// Import the runtime bundled with the plugin through the
    /// [`RUNTIME_IMPORT`] sentinel.
    #[default]
    Bundled,
    /// Emit no runtime import at all.
    Disabled,
    /// Import the runtime from a module the host resolves itself.
    Import(String),
}

/// User-supplied plugin options. Every field is optional.
#[derive(Builder)]
pub struct PugOptions {
    /// Root directory for resolving template includes and extends.
    /// Derived from the bundle entry point when not set.
    #[builder(into)]
    pub basedir: Option<PathBuf>,

    /// Keep the compiler's debug instrumentation in compiled functions.
    #[builder(default)]
    pub compile_debug: bool,

    /// Ask the compiler to print its token stream and AST.
    #[builder(default)]
    pub debug: bool,

    /// Doctype shorthand, defaults to "html".
    #[builder(into)]
    pub doctype: Option<String>,

    /// Named text filters available to templates.
    #[builder(default)]
    pub filters: Filters,

    /// Extra identifiers templates may reference, merged after the
    /// built-in globals.
    #[builder(default)]
    pub globals: Vec<String>,

    /// Inline the runtime helpers into each compiled function instead of
    /// importing a shared runtime module.
    #[builder(default)]
    pub inline_runtime_functions: bool,

    /// Whitespace handling. Deprecated upstream.
    #[builder(default)]
    pub pretty: Pretty,

    /// Hold template locals in a `self` namespace object.
    #[builder(default)]
    pub use_self: bool,

    /// Glob patterns of files the plugin should process.
    /// Empty means include everything.
    #[builder(default)]
    pub include: Vec<String>,

    /// Glob patterns of files the plugin must skip.
    #[builder(default)]
    pub exclude: Vec<String>,

    /// File extensions handled by the plugin, with or without the leading
    /// dot. The entry `"*"` disables extension filtering. Defaults to
    /// `.pug` and `.jade`.
    pub extensions: Option<Vec<String>>,

    /// Values handed to static templates at build time.
    /// Deprecated for runtime templates, which receive locals when called.
    #[builder(default)]
    pub locals: Locals,

    /// Runtime module selection.
    #[builder(default)]
    pub pug_runtime: PugRuntime,

    /// Emit a source map for runtime templates. On unless disabled.
    #[builder(default = true)]
    pub source_map: bool,

    /// Pattern naming the templates rendered once at build time.
    /// Defaults to files ending in `.static.pug` / `.static.jade`.
    pub static_pattern: Option<Regex>,
}

impl Default for PugOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for PugOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PugOptions")
            .field("basedir", &self.basedir)
            .field("compile_debug", &self.compile_debug)
            .field("debug", &self.debug)
            .field("doctype", &self.doctype)
            .field("filters_count", &self.filters.len())
            .field("globals", &self.globals)
            .field("inline_runtime_functions", &self.inline_runtime_functions)
            .field("pretty", &self.pretty)
            .field("use_self", &self.use_self)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("extensions", &self.extensions)
            .field("pug_runtime", &self.pug_runtime)
            .field("source_map", &self.source_map)
            .field("static_pattern", &self.static_pattern)
            .finish()
    }
}

/// The resolved plugin configuration. Immutable during the build; shared
/// read-only across overlapping transforms.
pub struct Config {
    /// Doctype shorthand
    pub doctype: String,
    /// Keep debug instrumentation in compiled functions
    pub compile_debug: bool,
    /// Print compiler diagnostics
    pub debug: bool,
    /// Whitespace handling
    pub pretty: Pretty,
    /// Named text filters
    pub filters: Filters,
    /// Hold locals in a `self` namespace
    pub use_self: bool,
    /// Inline runtime helpers per template
    pub inline_runtime_functions: bool,
    /// Build-time locals for static templates
    pub locals: Locals,
    /// Include/extend resolution root; `None` until [`Config::bind`] runs
    pub basedir: Option<PathBuf>,
    /// Ordered ambient identifier allow-list, duplicates removed
    pub globals: Vec<String>,
    /// Runtime module selection after normalization
    pub runtime: PugRuntime,
    /// Emit source maps for runtime templates
    pub source_map: bool,
    /// Static template naming pattern
    pub static_pattern: Regex,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("doctype", &self.doctype)
            .field("compile_debug", &self.compile_debug)
            .field("debug", &self.debug)
            .field("pretty", &self.pretty)
            .field("filters_count", &self.filters.len())
            .field("use_self", &self.use_self)
            .field("inline_runtime_functions", &self.inline_runtime_functions)
            .field("basedir", &self.basedir)
            .field("globals", &self.globals)
            .field("runtime", &self.runtime)
            .field("source_map", &self.source_map)
            .field("static_pattern", &self.static_pattern)
            .finish()
    }
}

/// Merge user options with defaults into an immutable [`Config`].
///
/// Absent fields are defaulted silently; nothing here fails.
pub fn parse_options(options: PugOptions) -> Config {
    // Inlining the helpers removes any use for a shared runtime module.
    let runtime = if options.inline_runtime_functions {
        PugRuntime::Disabled
    } else {
        options.pug_runtime
    };

    let mut globals: Vec<String> = DEFAULT_GLOBALS.iter().map(|g| g.to_string()).collect();
    for global in options.globals {
        if !globals.contains(&global) {
            globals.push(global);
        }
    }

    let basedir = options.basedir.map(|dir| resolve_path(&dir));

    Config {
        doctype: options.doctype.unwrap_or_else(|| "html".to_string()),
        compile_debug: options.compile_debug,
        debug: options.debug,
        pretty: options.pretty,
        filters: options.filters,
        use_self: options.use_self,
        inline_runtime_functions: options.inline_runtime_functions,
        locals: options.locals,
        basedir,
        globals,
        runtime,
        source_map: options.source_map,
        static_pattern: options
            .static_pattern
            .unwrap_or_else(|| DEFAULT_STATIC_PATTERN.clone()),
    }
}

impl Config {
    /// Whether `id` names a template rendered once at build time.
    pub fn is_static(&self, id: &str) -> bool {
        self.static_pattern.is_match(id)
    }

    /// The module specifier to import the runtime from, when one is emitted.
    pub fn runtime_import(&self) -> Option<&str> {
        match &self.runtime {
            PugRuntime::Bundled => Some(RUNTIME_IMPORT),
            PugRuntime::Disabled => None,
            PugRuntime::Import(specifier) => Some(specifier),
        }
    }

    /// Bind the configuration to the build context. Called once by the host
    /// before any transform runs.
    ///
    /// When no base directory was configured it is derived from the entry
    /// point's directory. An entry that is not a plain file path falls back
    /// to the working directory with a warning.
    pub fn bind(&mut self, input: Option<&str>) {
        if self.basedir.is_some() {
            return;
        }

        match input {
            Some(entry) if !entry.is_empty() && !entry.starts_with('\0') => {
                let resolved = resolve_path(Path::new(entry));
                let dir = resolved
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or(resolved);
                self.basedir = Some(dir);
            }
            _ => {
                tracing::warn!(
                    "bundle input is not a plain file path, using the working directory as `basedir`"
                );
                self.basedir = Some(resolve_path(Path::new(".")));
            }
        }
    }

    /// Copy the compiler-relevant fields into a per-file options record.
    ///
    /// An explicit field-by-field copy; the record is owned by a single
    /// transform invocation.
    pub fn compile_options(&self, filename: &str) -> CompileOptions {
        CompileOptions {
            filename: filename.to_string(),
            basedir: self.basedir.clone(),
            doctype: self.doctype.clone(),
            pretty: self.pretty.clone(),
            filters: self.filters.clone(),
            use_self: self.use_self,
            debug: self.debug,
            compile_debug: self.compile_debug,
            globals: self.globals.clone(),
            inline_runtime_functions: self.inline_runtime_functions,
        }
    }

    /// The value record handed to a static template when it is rendered at
    /// build time.
    ///
    /// Merged in increasing precedence: configured locals, the resolved
    /// configuration snapshot, the current file name. Configuration values
    /// override locals of the same name.
    pub fn static_locals(&self, filename: &str) -> Locals {
        let mut merged = self.locals.clone();

        merged.insert("doctype".into(), Value::String(self.doctype.clone()));
        merged.insert("compileDebug".into(), Value::Bool(self.compile_debug));
        merged.insert("debug".into(), Value::Bool(self.debug));
        merged.insert("self".into(), Value::Bool(self.use_self));
        merged.insert(
            "inlineRuntimeFunctions".into(),
            Value::Bool(self.inline_runtime_functions),
        );
        merged.insert("sourceMap".into(), Value::Bool(self.source_map));
        merged.insert(
            "pretty".into(),
            match &self.pretty {
                Pretty::Off => Value::Bool(false),
                Pretty::On => Value::Bool(true),
                Pretty::Indent(indent) => Value::String(indent.clone()),
            },
        );
        if let Some(basedir) = &self.basedir {
            merged.insert(
                "basedir".into(),
                Value::String(basedir.to_string_lossy().into_owned()),
            );
        }
        merged.insert(
            "globals".into(),
            Value::Array(self.globals.iter().cloned().map(Value::String).collect()),
        );
        merged.insert(
            "staticPattern".into(),
            Value::String(self.static_pattern.as_str().to_string()),
        );
        merged.insert(
            "runtimeImport".into(),
            Value::String(self.runtime_import().unwrap_or_default().to_string()),
        );

        merged.insert("filename".into(), Value::String(filename.to_string()));
        merged
    }
}

/// Resolve a path against the working directory and normalize it.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    absolute.clean()
}

//! Bundler plugin surface for pugdown
//!
//! This crate packages the pugdown transform pipeline behind the hook
//! contract a host bundler drives. The host stays an external collaborator:
//! the hooks here are plain methods over plain data, and an adapter for a
//! concrete bundler maps its own hook types onto them.
//!
//! ## Architecture
//!
//! ```text
//! .pug file → transform() hook → pugdown pipeline → ES module → host bundler
//!                 ↑
//!         resolve_id()/load() serve the bundled runtime for `\0pug-runtime`
//! ```
//!
//! ## Hook protocol
//!
//! - `bind` — the host's options/build-start hook, called once before any
//!   transform; derives the base directory from the entry point when the
//!   user configured none.
//! - `resolve_id` — claims the runtime import sentinel as a virtual module.
//! - `load` — serves the embedded runtime module for the sentinel.
//! - `transform` — gates the file through the filter, then compiles it.
//!   `Ok(None)` means "not handled, leave the file to the host".
//!
//! ## Example
//!
//! ```no_run
//! use pugdown_plugin::PugPlugin;
//! use pugdown::PugOptions;
//! # use pugdown::{ClientTemplate, CompileError, CompileOptions, Locals,
//! #               RenderedTemplate, TemplateCompiler};
//! # struct MyCompiler;
//! # impl TemplateCompiler for MyCompiler {
//! #     fn render(&self, _: &str, _: &CompileOptions, _: &Locals)
//! #         -> Result<RenderedTemplate, CompileError> { unimplemented!() }
//! #     fn compile_client(&self, _: &str, _: &CompileOptions)
//! #         -> Result<ClientTemplate, CompileError> { unimplemented!() }
//! # }
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut plugin = PugPlugin::new(PugOptions::default(), MyCompiler)?;
//! plugin.bind(Some("src/main.js"));
//!
//! if let Some(module) = plugin.transform("p Hello", "views/hello.pug")? {
//!     assert!(module.code.contains("export default"));
//! }
//! # Ok(()) }
//! ```

use tracing::debug;

use pugdown::{
    parse_options, Config, FileFilter, PugOptions, PugRuntime, TemplateCompiler,
    TransformedModule, RUNTIME_IMPORT,
};

mod runtime;

pub use runtime::PUG_RUNTIME_SOURCE;

/// The plugin: resolved configuration, compiled file filter, and the
/// template compiler backend.
///
/// Construction parses the options; [`PugPlugin::bind`] completes
/// initialization once the host knows its entry point. Every later hook
/// takes `&self`, so overlapping transforms share the plugin freely.
pub struct PugPlugin<C> {
    filter: FileFilter,
    config: Config,
    compiler: C,
}

impl<C: TemplateCompiler> PugPlugin<C> {
    /// Create the plugin from user options and a compiler backend.
    ///
    /// Fails only when a user-supplied include/exclude glob does not
    /// compile; everything else defaults permissively.
    pub fn new(options: PugOptions, compiler: C) -> Result<Self, pugdown::PugError> {
        let filter = FileFilter::new(&options)?;
        let config = parse_options(options);

        Ok(Self {
            filter,
            config,
            compiler,
        })
    }

    /// The plugin name, for the host's debugging and logging.
    pub fn name(&self) -> &'static str {
        "pugdown"
    }

    /// The resolved configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Options hook: bind the configuration to the build context.
    ///
    /// Called once by the host before any transform. When no base directory
    /// was configured it is derived from `input`, the entry-point path; an
    /// entry that is not a plain path falls back to the working directory
    /// with a warning.
    pub fn bind(&mut self, input: Option<&str>) {
        self.config.bind(input);
    }

    /// Resolve-id hook: claim the runtime import sentinel.
    ///
    /// Returns the sentinel itself as the resolved id, keeping the runtime
    /// a virtual module the host never looks up on disk. Ids other than the
    /// sentinel, and every id when the bundled runtime is not in use, fall
    /// through to the host's own resolution.
    pub fn resolve_id(&self, id: &str) -> Option<&'static str> {
        if self.config.runtime == PugRuntime::Bundled && id == RUNTIME_IMPORT {
            Some(RUNTIME_IMPORT)
        } else {
            None
        }
    }

    /// Load hook: serve the embedded runtime module for the sentinel.
    pub fn load(&self, id: &str) -> Option<&'static str> {
        if self.config.runtime == PugRuntime::Bundled && id == RUNTIME_IMPORT {
            Some(PUG_RUNTIME_SOURCE)
        } else {
            None
        }
    }

    /// Transform hook: compile one template file into an ES module.
    ///
    /// Returns `Ok(None)` when the filter rejects the id. Compiler errors
    /// propagate to the host's error reporting unmodified; they abort only
    /// this file's transform.
    pub fn transform(&self, code: &str, id: &str) -> anyhow::Result<Option<TransformedModule>> {
        if !self.filter.accepts(id) {
            return Ok(None);
        }

        debug!(id, "transforming template");

        let module = pugdown::transform(&self.config, &self.compiler, code, id)?;
        Ok(Some(module))
    }
}

//! # pugdown
//!
//! Bundler-agnostic transform pipeline that compiles Pug/Jade templates
//! into ES modules during a build.
//!
//! The pipeline is thin glue around two external collaborators: a template
//! compiler backend (the [`TemplateCompiler`] seam) and the host bundler,
//! which drives the hook surface in the `pugdown-plugin` crate. What lives
//! here is everything in between:
//!
//! - option resolution into an immutable [`options::Config`]
//! - per-file gating through [`filter::FileFilter`]
//! - hoisting of template-level import directives ([`imports::hoist_imports`])
//! - the static/runtime compile adapter and module emitter
//!   ([`transform::transform`])
//! - source map generation for runtime templates ([`sourcemap::generate`])
//!
//! Static templates (matching the configured pattern) are rendered at build
//! time and ship as a string literal; all other templates become a
//! default-exported render function the application calls with its locals.
//!
//! ## Example
//!
//! ```no_run
//! use pugdown::{parse_options, transform, PugOptions};
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
//! # fn main() -> Result<(), pugdown::PugError> {
//! let mut config = parse_options(PugOptions::default());
//! config.bind(Some("src/main.js"));
//!
//! let compiler = MyCompiler;
//! let module = transform(&config, &compiler, "p Hello", "views/hello.pug")?;
//! assert!(module.code.contains("export default"));
//! # Ok(()) }
//! ```

pub mod compiler;
pub mod error;
pub mod filter;
pub mod imports;
pub mod options;
pub mod sourcemap;
pub mod transform;

pub use compiler::{
    ClientTemplate, CompileOptions, Filters, Locals, RenderedTemplate, TemplateCompiler,
    TemplateFilter,
};
pub use error::{CompileError, PugError};
pub use filter::{FileFilter, DEFAULT_EXTENSIONS};
pub use imports::hoist_imports;
pub use options::{parse_options, Config, Pretty, PugOptions, PugRuntime, RUNTIME_IMPORT};
pub use sourcemap::{GeneratedMap, SourceMap, SourceMapOptions};
pub use transform::{dedup_dependencies, transform, TransformedModule};

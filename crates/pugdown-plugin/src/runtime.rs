//! The bundled runtime module.
//!
//! An ES module wrapping the shared template helper functions (attribute
//! merging, class/style serialization, escaping, error rethrow) as a
//! default-exported namespace object. Generated ahead of time from the
//! upstream runtime source and embedded here, so the plugin can serve it
//! for the [`RUNTIME_IMPORT`](pugdown::RUNTIME_IMPORT) sentinel without
//! touching the filesystem.

/// Source text of the bundled runtime module.
pub const PUG_RUNTIME_SOURCE: &str = include_str!("../assets/pug-runtime.mjs");

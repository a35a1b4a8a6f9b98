//! The per-file transform: template source in, ES module out.
//!
//! Static templates (those matching the configured pattern) are rendered at
//! build time and ship as a string literal. Everything else compiles to a
//! default-exported render function, with template-level imports hoisted
//! ahead of the body and the shared runtime imported when the compiled code
//! references it.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::compiler::TemplateCompiler;
use crate::error::PugError;
use crate::imports::hoist_imports;
use crate::options::Config;
use crate::sourcemap::{self, SourceMap, SourceMapOptions};

/// The declaration header every client compile produces.
const TEMPLATE_DECLARATION: &str = "function template(";

/// Compiled bodies reference the shared helpers through this namespace.
static RE_RUNTIME_NAMESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpug\.").unwrap());

/// The transform hook's output record.
#[derive(Debug, Clone)]
pub struct TransformedModule {
    /// The emitted ES module source
    pub code: String,
    /// Source map, for runtime templates when enabled
    pub map: Option<SourceMap>,
    /// Tracked include dependencies, deduplicated; `None` when tracking
    /// found nothing
    pub dependencies: Option<Vec<String>>,
}

/// Remove duplicate dependency paths, keeping the first occurrence of each.
///
/// An empty list is reported as `None` to distinguish "no extra
/// dependencies" from an empty tracking result.
pub fn dedup_dependencies(dependencies: Vec<String>) -> Option<Vec<String>> {
    if dependencies.is_empty() {
        return None;
    }

    let mut seen = FxHashSet::default();
    let deduped: Vec<String> = dependencies
        .into_iter()
        .filter(|dep| seen.insert(dep.clone()))
        .collect();

    Some(deduped)
}

/// Transform one accepted template file into an ES module.
///
/// Compilation errors from the backend propagate unmodified; they abort
/// only this file's transform.
pub fn transform(
    config: &Config,
    compiler: &dyn TemplateCompiler,
    source: &str,
    id: &str,
) -> Result<TransformedModule, PugError> {
    if config.is_static(id) {
        transform_static(config, compiler, source, id)
    } else {
        transform_runtime(config, compiler, source, id)
    }
}

/// Render now; ship only the textual result.
///
/// Debug instrumentation is irrelevant here since execution happens at
/// build time.
fn transform_static(
    config: &Config,
    compiler: &dyn TemplateCompiler,
    source: &str,
    id: &str,
) -> Result<TransformedModule, PugError> {
    let options = config.compile_options(id);
    let locals = config.static_locals(id);

    let rendered = compiler.render(source, &options, &locals)?;
    let code = format!("export default {};\n", serde_json::to_string(&rendered.html)?);

    debug!(id, bytes = code.len(), "rendered static template");

    Ok(TransformedModule {
        code,
        map: None,
        dependencies: dedup_dependencies(rendered.dependencies),
    })
}

/// Compile to a function the application calls later with its own locals.
fn transform_runtime(
    config: &Config,
    compiler: &dyn TemplateCompiler,
    source: &str,
    id: &str,
) -> Result<TransformedModule, PugError> {
    let mut options = config.compile_options(id);

    // An accurate map needs the compiler's line instrumentation. Forced on
    // for this invocation only; the configuration's own flag decides later
    // whether the instrumentation stays in the output.
    if config.source_map {
        options.compile_debug = true;
    }

    let (body_source, mut imports) = hoist_imports(source);

    let template = compiler.compile_client(&body_source, &options)?;

    // Exactly one top-level declaration is expected; rewrite its header to
    // the anonymous default export.
    let body = template
        .body
        .replacen(TEMPLATE_DECLARATION, "\nexport default function(", 1);

    if let Some(specifier) = config.runtime_import() {
        if RE_RUNTIME_NAMESPACE.is_match(&body) {
            imports.insert(0, format!("import pug from '{}';", specifier));
        }
    }

    let code = format!("{}{};\n", imports.join("\n"), body);
    let dependencies = dedup_dependencies(template.dependencies);

    debug!(
        id,
        imports = imports.len(),
        dependencies = dependencies.as_ref().map_or(0, Vec::len),
        "compiled runtime template"
    );

    if config.source_map {
        let generated = sourcemap::generate(
            id,
            &code,
            source,
            &SourceMapOptions {
                basedir: config.basedir.as_deref(),
                keep_debug_lines: config.compile_debug,
                exclude_content: false,
            },
        );
        return Ok(TransformedModule {
            code: generated.code,
            map: Some(generated.map),
            dependencies,
        });
    }

    Ok(TransformedModule {
        code,
        map: None,
        dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{
        ClientTemplate, CompileOptions, Locals, RenderedTemplate, TemplateCompiler,
    };
    use crate::error::CompileError;
    use crate::options::{parse_options, PugOptions, PugRuntime, RUNTIME_IMPORT};
    use serde_json::Value;

    /// A backend shaped like real template codegen: renders `p= name`-style
    /// one-liners and compiles to a `function template(` body that calls
    /// into the `pug.` namespace.
    struct FakeCompiler {
        dependencies: Vec<String>,
    }

    impl FakeCompiler {
        fn new() -> Self {
            Self {
                dependencies: Vec::new(),
            }
        }

        fn with_dependencies(dependencies: &[&str]) -> Self {
            Self {
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            }
        }
    }

    impl TemplateCompiler for FakeCompiler {
        fn render(
            &self,
            source: &str,
            options: &CompileOptions,
            locals: &Locals,
        ) -> Result<RenderedTemplate, CompileError> {
            let line = source.lines().next().unwrap_or_default();
            let html = if let Some(key) = line.strip_prefix("p= ") {
                let value = match locals.get(key.trim()) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                format!("<p>{}</p>", value)
            } else if let Some(text) = line.strip_prefix("p ") {
                format!("<p>{}</p>", text)
            } else {
                return Err(CompileError::new("unexpected token")
                    .with_file(&options.filename)
                    .with_location(1, 1));
            };

            Ok(RenderedTemplate {
                html,
                dependencies: self.dependencies.clone(),
            })
        }

        fn compile_client(
            &self,
            source: &str,
            options: &CompileOptions,
        ) -> Result<ClientTemplate, CompileError> {
            if source.contains("broken") {
                return Err(CompileError::new("unexpected token")
                    .with_file(&options.filename)
                    .with_location(2, 5));
            }

            let mut body = String::from(
                "function template(locals) {var pug_html = \"\", pug_interp;\n",
            );
            for (index, line) in source.lines().enumerate() {
                if options.compile_debug {
                    body.push_str(&format!(";pug_debug_line = {};\n", index + 1));
                }
                body.push_str(&format!(
                    "pug_html = pug_html + pug.escape({:?});\n",
                    line
                ));
            }
            body.push_str("return pug_html;}");

            Ok(ClientTemplate {
                body,
                dependencies: self.dependencies.clone(),
            })
        }
    }

    fn config(options: PugOptions) -> crate::options::Config {
        parse_options(options)
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let deps = vec![
            "b.pug".to_string(),
            "a.pug".to_string(),
            "b.pug".to_string(),
            "c.pug".to_string(),
            "a.pug".to_string(),
        ];
        assert_eq!(
            dedup_dependencies(deps),
            Some(vec!["b.pug".into(), "a.pug".into(), "c.pug".into()])
        );
    }

    #[test]
    fn empty_dependency_list_is_reported_as_absent() {
        assert_eq!(dedup_dependencies(Vec::new()), None);
    }

    #[test]
    fn static_template_ships_as_a_string_literal() {
        let mut locals = Locals::new();
        locals.insert("name".into(), Value::String("World".into()));
        let config = config(PugOptions::builder().locals(locals).build());

        let module = transform(
            &config,
            &FakeCompiler::new(),
            "p= name",
            "views/hello.static.pug",
        )
        .unwrap();

        assert_eq!(module.code, "export default \"<p>World</p>\";\n");
        assert!(module.map.is_none());
        assert!(module.dependencies.is_none());
    }

    #[test]
    fn static_output_is_independent_of_compile_debug() {
        let mut locals = Locals::new();
        locals.insert("name".into(), Value::String("World".into()));

        let plain = config(PugOptions::builder().locals(locals.clone()).build());
        let debugging = config(
            PugOptions::builder()
                .locals(locals)
                .compile_debug(true)
                .build(),
        );

        let id = "views/hello.static.pug";
        let a = transform(&plain, &FakeCompiler::new(), "p= name", id).unwrap();
        let b = transform(&debugging, &FakeCompiler::new(), "p= name", id).unwrap();

        assert_eq!(a.code, b.code);
    }

    #[test]
    fn runtime_template_exports_a_default_function() {
        let config = config(PugOptions::builder().source_map(false).build());

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        assert!(module.code.contains("export default function("));
        assert!(
            !module.code.contains("function template("),
            "declaration header must be rewritten: {}",
            module.code
        );
        assert!(module.code.ends_with(";\n"));
    }

    #[test]
    fn runtime_import_is_prepended_when_the_body_references_the_namespace() {
        let config = config(PugOptions::builder().source_map(false).build());

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        let first_line = module.code.lines().next().unwrap();
        assert_eq!(
            first_line,
            format!("import pug from '{}';", RUNTIME_IMPORT)
        );
    }

    #[test]
    fn disabled_runtime_never_emits_the_import() {
        let config = config(
            PugOptions::builder()
                .pug_runtime(PugRuntime::Disabled)
                .source_map(false)
                .build(),
        );

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        assert!(
            !module.code.contains("import pug from"),
            "no runtime import expected: {}",
            module.code
        );
        assert!(module.code.contains("pug.escape"), "body still references the namespace");
    }

    #[test]
    fn external_runtime_specifier_is_used_verbatim() {
        let config = config(
            PugOptions::builder()
                .pug_runtime(PugRuntime::Import("pug-helpers".to_string()))
                .source_map(false)
                .build(),
        );

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        assert!(module.code.starts_with("import pug from 'pug-helpers';"));
    }

    #[test]
    fn hoisted_imports_appear_after_the_runtime_import_in_order() {
        let config = config(PugOptions::builder().source_map(false).build());
        let source = "- import a from './a'\np one\n- import { b } from './b'";

        let module = transform(&config, &FakeCompiler::new(), source, "views/hello.pug")
            .unwrap();

        let lines: Vec<&str> = module.code.lines().collect();
        assert_eq!(lines[0], format!("import pug from '{}';", RUNTIME_IMPORT));
        assert_eq!(lines[1], "import a from './a';");
        assert_eq!(lines[2], "import { b } from './b';");
        assert!(
            module.code.find("import { b }").unwrap()
                < module.code.find("export default function(").unwrap(),
            "imports precede the compiled body"
        );
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let config = config(PugOptions::builder().source_map(false).build());
        let compiler = FakeCompiler::with_dependencies(&[
            "partials/head.pug",
            "partials/foot.pug",
            "partials/head.pug",
        ]);

        let module = transform(&config, &compiler, "p Hello", "views/hello.pug").unwrap();

        assert_eq!(
            module.dependencies,
            Some(vec![
                "partials/head.pug".to_string(),
                "partials/foot.pug".to_string(),
            ])
        );
    }

    #[test]
    fn source_map_generation_strips_the_forced_instrumentation() {
        let config = config(PugOptions::default());

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        let map = module.map.expect("source map requested by default");
        assert_eq!(map.sources, vec!["views/hello.pug"]);
        assert!(
            !module.code.contains("pug_debug_line"),
            "instrumentation stays only with compile_debug: {}",
            module.code
        );
        assert_eq!(
            map.mappings.split(';').count(),
            module.code.split('\n').count()
        );
    }

    #[test]
    fn compile_debug_keeps_the_instrumentation_in_mapped_output() {
        let config = config(PugOptions::builder().compile_debug(true).build());

        let module = transform(&config, &FakeCompiler::new(), "p Hello", "views/hello.pug")
            .unwrap();

        assert!(module.map.is_some());
        assert!(module.code.contains("pug_debug_line"));
    }

    #[test]
    fn compile_errors_propagate_unmodified() {
        let config = config(PugOptions::builder().source_map(false).build());

        let err = transform(
            &config,
            &FakeCompiler::new(),
            "div broken",
            "views/broken.pug",
        )
        .unwrap_err();

        match err {
            PugError::Compile(compile) => {
                assert_eq!(compile.message, "unexpected token");
                assert_eq!(compile.file.as_deref(), Some("views/broken.pug"));
                assert_eq!(compile.line, Some(2));
                assert_eq!(compile.column, Some(5));
            }
            other => panic!("expected a compile error, got {:?}", other),
        }
    }
}

//! Hoisting of import directives out of template bodies.
//!
//! Template authors write module imports as unbuffered code lines
//! (`- import x from './x'`). The compiler would otherwise emit them inside
//! the template function, where module syntax is illegal, so the transform
//! lifts them to the top of the generated module before compiling.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// An unbuffered code line whose code is an import directive: indentation,
/// the `-` marker, then `import` followed by a space, star, brace or quote.
static RE_IMPORTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^([ \t]*-)[ \t]*(import[ \t*{'"].*)"#).unwrap());

/// Move every import directive out of `source`.
///
/// Returns the processed source and the extracted import statements in
/// encounter order, each terminated with `;`. Matched lines keep their
/// indentation and code marker so the line count, and with it the
/// compiler's line-oriented error reporting, is unchanged.
pub fn hoist_imports(source: &str) -> (String, Vec<String>) {
    let mut imports = Vec::new();

    let processed = RE_IMPORTS.replace_all(source, |caps: &Captures<'_>| {
        let mut statement = caps[2].trim().to_string();
        if !statement.ends_with(';') {
            statement.push(';');
        }
        imports.push(statement);

        // Keep only the indentation and the code marker.
        caps[1].to_string()
    });

    (processed.into_owned(), imports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_single_import() {
        let source = "- import utils from './utils'\np Hello";
        let (processed, imports) = hoist_imports(source);

        assert_eq!(imports, vec!["import utils from './utils';"]);
        assert_eq!(processed, "-\np Hello");
    }

    #[test]
    fn matches_every_occurrence_in_encounter_order() {
        let source = "\
- import a from './a';
p one
  - import { b } from './b'
p two
- import * as c from './c'
";
        let (processed, imports) = hoist_imports(source);

        assert_eq!(
            imports,
            vec![
                "import a from './a';",
                "import { b } from './b';",
                "import * as c from './c';",
            ]
        );
        assert_eq!(processed, "-\np one\n  -\np two\n-\n");
    }

    #[test]
    fn preserves_line_count_and_indentation() {
        let source = "p start\n    - import x from './x'\np end";
        let (processed, imports) = hoist_imports(source);

        assert_eq!(imports.len(), 1);
        assert_eq!(processed.lines().count(), source.lines().count());
        assert_eq!(processed, "p start\n    -\np end");
    }

    #[test]
    fn appends_the_missing_statement_terminator() {
        let (_, imports) = hoist_imports("- import 'side-effect'");
        assert_eq!(imports, vec!["import 'side-effect';"]);

        let (_, already) = hoist_imports("- import 'side-effect';");
        assert_eq!(already, vec!["import 'side-effect';"]);
    }

    #[test]
    fn ignores_non_import_code_lines() {
        let source = "- var x = 1\n- importantVariable = 2\np= x";
        let (processed, imports) = hoist_imports(source);

        assert!(imports.is_empty());
        assert_eq!(processed, source);
    }

    #[test]
    fn recognizes_the_import_delimiters() {
        for (line, expected) in [
            ("- import x from './x'", "import x from './x';"),
            ("- import* as ns from './ns'", "import* as ns from './ns';"),
            ("- import{ a } from './a'", "import{ a } from './a';"),
            ("- import'./side'", "import'./side';"),
            ("- import\"./side\"", "import\"./side\";"),
        ] {
            let (_, imports) = hoist_imports(line);
            assert_eq!(imports, vec![expected], "line: {:?}", line);
        }
    }
}

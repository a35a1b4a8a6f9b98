//! File filtering: decides which candidate ids the plugin processes.
//!
//! The predicate combines include/exclude globs with an extension list, all
//! compiled once at plugin construction. Ids starting with the `\0` virtual
//! module sentinel are never processed, regardless of patterns.

use std::path::Path;

use regex::Regex;

use crate::error::PugError;
use crate::options::PugOptions;

/// Extensions handled when the user supplies none.
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".pug", ".jade"];

/// The compiled include/exclude/extension predicate.
#[derive(Debug)]
pub struct FileFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    /// `None` disables extension filtering (the `"*"` wildcard)
    extensions: Option<Vec<String>>,
}

impl FileFilter {
    /// Build the filter from plugin options, with the plugin's default
    /// template extensions.
    pub fn new(options: &PugOptions) -> Result<Self, PugError> {
        Self::with_extensions(options, &DEFAULT_EXTENSIONS)
    }

    /// Build the filter with an explicit default extension list, used when
    /// the user options carry none.
    pub fn with_extensions(options: &PugOptions, defaults: &[&str]) -> Result<Self, PugError> {
        let include = compile_globs(&options.include, "include")?;
        let exclude = compile_globs(&options.exclude, "exclude")?;

        let extensions = match &options.extensions {
            Some(list) => normalize_extensions(list.iter().map(String::as_str)),
            None => normalize_extensions(defaults.iter().copied()),
        };

        Ok(Self {
            include,
            exclude,
            extensions,
        })
    }

    /// Whether the plugin should process `id`.
    pub fn accepts(&self, id: &str) -> bool {
        // Virtual module ids belong to the host bundler.
        if id.starts_with('\0') {
            return false;
        }

        let included = self.include.is_empty() || self.include.iter().any(|re| matches(re, id));
        if !included || self.exclude.iter().any(|re| matches(re, id)) {
            return false;
        }

        match &self.extensions {
            None => true,
            Some(list) => extension_of(id).is_some_and(|ext| list.contains(&ext)),
        }
    }
}

/// Normalize an extension list: ensure the leading dot, lower-case.
///
/// Returns `None` when the list contains the `"*"` wildcard, which disables
/// extension filtering entirely. Normalization is idempotent.
pub fn normalize_extensions<'a>(exts: impl IntoIterator<Item = &'a str>) -> Option<Vec<String>> {
    let mut normalized = Vec::new();
    for ext in exts {
        if ext == "*" {
            return None;
        }
        let ext = ext.to_ascii_lowercase();
        if ext.starts_with('.') {
            normalized.push(ext);
        } else {
            normalized.push(format!(".{}", ext));
        }
    }
    Some(normalized)
}

fn extension_of(id: &str) -> Option<String> {
    Path::new(id)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

fn compile_globs(patterns: &[String], kind: &'static str) -> Result<Vec<Regex>, PugError> {
    patterns
        .iter()
        .map(|pattern| {
            glob_to_regex(pattern).map_err(|source| PugError::Pattern {
                kind,
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Compile a glob pattern to an anchored regex.
///
/// `?` matches any character except the separator, `*` any run except the
/// separator, `**` any run including separators. Everything else is literal.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` spans zero or more whole segments.
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        re.push_str("(?:.*/)?");
                    } else {
                        re.push_str(".*");
                    }
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            _ => re.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }

    re.push('$');
    Regex::new(&re)
}

/// Match `id` against a compiled pattern. Relative patterns also match ids
/// given as absolute paths under the working directory.
fn matches(re: &Regex, id: &str) -> bool {
    if re.is_match(id) {
        return true;
    }
    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(rel) = Path::new(id).strip_prefix(&cwd) {
            return re.is_match(&rel.to_string_lossy());
        }
    }
    false
}

//! Source map generation for compiled runtime templates.
//!
//! Template compilers instrument debug builds with line markers
//! (`;pug_debug_line = N;`, optionally followed by
//! `pug_debug_filename = "...";` when an include switches files). The
//! generator walks those markers, maps each emitted line back to its
//! template line, and strips the instrumentation unless the user asked to
//! keep it. The result is the cleaned module code plus a Source Map v3
//! record.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A debug marker line: the line assignment, optionally followed by a
/// filename assignment when the compiled output switches source files.
static RE_DEBUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^;?\s*pug_debug_line\s*=\s*(\d+)\s*;?(?:\s*pug_debug_filename\s*=\s*"((?:[^"\\]|\\.)*)"\s*;?)?\s*$"#,
    )
    .unwrap()
});

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A Source Map v3 record, serialized with the standard field names.
#[derive(Debug, Clone, Serialize)]
pub struct SourceMap {
    /// Always 3
    pub version: u32,
    /// The file this map describes
    pub file: String,
    #[serde(rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Source file names, relative to the base directory when possible
    pub sources: Vec<String>,
    /// Source contents; `None` for includes whose text the transform
    /// never sees
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    /// Base64 VLQ line mappings
    pub mappings: String,
}

/// Options for [`generate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceMapOptions<'a> {
    /// Source names are written relative to this directory
    pub basedir: Option<&'a Path>,
    /// Keep the debug instrumentation lines in the emitted code
    pub keep_debug_lines: bool,
    /// Leave the template text out of the map
    pub exclude_content: bool,
}

/// The cleaned module code and its source map.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub code: String,
    pub map: SourceMap,
}

/// Build the source map for `compiled`, the assembled module code of the
/// template `filename` whose source text is `template`.
pub fn generate(
    filename: &str,
    compiled: &str,
    template: &str,
    options: &SourceMapOptions<'_>,
) -> GeneratedMap {
    let mut sources = vec![relative_name(filename, options.basedir)];
    let mut source_files = vec![filename.to_string()];
    let mut sources_content = vec![if options.exclude_content {
        None
    } else {
        Some(template.to_string())
    }];

    // (source index, 0-based template line) for each kept output line;
    // None for lines emitted before the first marker.
    let mut line_map: Vec<Option<(usize, u32)>> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();
    let mut current: Option<(usize, u32)> = None;

    for line in compiled.split('\n') {
        if let Some(caps) = RE_DEBUG.captures(line) {
            let template_line: u32 = caps[1].parse().unwrap_or(1);

            let source_index = match caps.get(2) {
                Some(raw) => {
                    let file = decode_js_string(raw.as_str());
                    match source_files.iter().position(|known| *known == file) {
                        Some(index) => index,
                        None => {
                            source_files.push(file.clone());
                            sources.push(relative_name(&file, options.basedir));
                            sources_content.push(None);
                            source_files.len() - 1
                        }
                    }
                }
                None => current.map(|(index, _)| index).unwrap_or(0),
            };

            current = Some((source_index, template_line.saturating_sub(1)));

            if !options.keep_debug_lines {
                continue;
            }
        }

        kept.push(line);
        line_map.push(current);
    }

    let mappings = encode_mappings(&line_map);
    let code = kept.join("\n");

    GeneratedMap {
        code,
        map: SourceMap {
            version: 3,
            file: relative_name(filename, options.basedir),
            source_root: None,
            sources,
            sources_content,
            names: Vec::new(),
            mappings,
        },
    }
}

/// Encode one mapping group per output line. Mapped lines get a single
/// segment at column zero pointing at column zero of their template line.
fn encode_mappings(line_map: &[Option<(usize, u32)>]) -> String {
    let mut mappings = String::new();
    let mut previous_source: i64 = 0;
    let mut previous_line: i64 = 0;

    for (index, mapping) in line_map.iter().enumerate() {
        if index > 0 {
            mappings.push(';');
        }

        if let Some((source, line)) = mapping {
            let source = *source as i64;
            let line = *line as i64;

            encode_vlq(&mut mappings, 0);
            encode_vlq(&mut mappings, source - previous_source);
            encode_vlq(&mut mappings, line - previous_line);
            encode_vlq(&mut mappings, 0);

            previous_source = source;
            previous_line = line;
        }
    }

    mappings
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Decode the JavaScript string literal body the compiler wrote into a
/// `pug_debug_filename` assignment.
fn decode_js_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn relative_name(path: &str, basedir: Option<&Path>) -> String {
    if let Some(base) = basedir {
        if let Ok(relative) = Path::new(path).strip_prefix(base) {
            return relative.to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

//! crates/gendoc_core/src/summarize.rs
//!
//! The code summarizer: a best-effort structural scan of an uploaded source
//! file. It extracts top-level function and class names for the languages we
//! recognize, counts lines for everything else, and converts every failure
//! into the `Failed` summary variant - nothing escapes this boundary.

use crate::domain::ParseSummary;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder recorded for a declaration whose name cannot be recovered,
/// so symbol counts stay accurate.
const ANONYMOUS: &str = "<anonymous>";

// Top-level declarations only: each pattern is matched against whole lines,
// anchored at column zero, so indented (nested) declarations never match.
static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)?\s*\(")
        .unwrap()
});
static JS_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+(?:default\s+)?)?class(?:\s+([A-Za-z_$][A-Za-z0-9_$]*))?")
        .unwrap()
});
static PY_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static PY_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Produces a [`ParseSummary`] for `source` using `extension_hint` (with or
/// without the leading dot, any case) to pick a grammar.
///
/// Unrecognized extensions skip the structural scan and report a line count
/// with empty symbol lists. A scan failure is reported as
/// `ParseSummary::Failed` and the caller is expected to proceed regardless.
pub fn summarize(source: &str, extension_hint: &str) -> ParseSummary {
    let lines = line_count(source);
    let ext = extension_hint.trim_start_matches('.').to_ascii_lowercase();

    let scanned = match ext.as_str() {
        "js" | "jsx" => scan(source, &JS_FUNCTION, &JS_CLASS),
        "py" => scan(source, &PY_FUNCTION, &PY_CLASS),
        _ => return ParseSummary::lines_only(lines),
    };

    match scanned {
        Ok((functions, classes)) => ParseSummary::Parsed {
            functions,
            classes,
            lines,
        },
        Err(error) => ParseSummary::Failed { error },
    }
}

/// Count of newline-delimited segments; an empty file is one line.
fn line_count(source: &str) -> usize {
    source.split('\n').count()
}

/// Collects top-level function and class names in source order.
fn scan(source: &str, function_re: &Regex, class_re: &Regex) -> Result<(Vec<String>, Vec<String>), String> {
    // A file that reached us under a code extension but is not text cannot
    // be scanned; report it instead of producing garbage symbol names.
    if let Some(offset) = source.find('\0') {
        return Err(format!("source is not text (NUL byte at offset {offset})"));
    }

    // Lines are visited top to bottom, so each list keeps declaration order.
    let functions = source
        .lines()
        .filter_map(|line| function_re.captures(line))
        .map(|caps| name_or_anonymous(caps.get(1)))
        .collect();
    let classes = source
        .lines()
        .filter_map(|line| class_re.captures(line))
        .map(|caps| name_or_anonymous(caps.get(1)))
        .collect();
    Ok((functions, classes))
}

fn name_or_anonymous(name: Option<regex::Match<'_>>) -> String {
    name.map(|m| m.as_str().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(summary: ParseSummary) -> (Vec<String>, Vec<String>, usize) {
        match summary {
            ParseSummary::Parsed {
                functions,
                classes,
                lines,
            } => (functions, classes, lines),
            ParseSummary::Failed { error } => panic!("expected parsed summary, got '{error}'"),
        }
    }

    #[test]
    fn javascript_top_level_symbols_in_source_order() {
        let src = "function alpha() {}\nclass Widget {}\nfunction beta(x) { return x; }\n";
        let (functions, classes, lines) = parsed(summarize(src, ".js"));
        assert_eq!(functions, vec!["alpha", "beta"]);
        assert_eq!(classes, vec!["Widget"]);
        assert_eq!(lines, 4);
    }

    #[test]
    fn nested_declarations_are_not_top_level() {
        let src = "function outer() {\n  function inner() {}\n}\n";
        let (functions, _, _) = parsed(summarize(src, "js"));
        assert_eq!(functions, vec!["outer"]);
    }

    #[test]
    fn anonymous_default_export_uses_placeholder() {
        let src = "export default function () {}\nexport default class {}\n";
        let (functions, classes, _) = parsed(summarize(src, ".jsx"));
        assert_eq!(functions, vec![ANONYMOUS]);
        assert_eq!(classes, vec![ANONYMOUS]);
    }

    #[test]
    fn python_defs_and_classes() {
        let src = "import os\n\ndef load():\n    pass\n\nclass Loader:\n    def run(self):\n        pass\n\nasync def main():\n    pass\n";
        let (functions, classes, lines) = parsed(summarize(src, ".py"));
        assert_eq!(functions, vec!["load", "main"]);
        assert_eq!(classes, vec!["Loader"]);
        assert_eq!(lines, 12);
    }

    #[test]
    fn unsupported_extension_counts_lines_only() {
        let src = "fn main() {\n    println!(\"hi\");\n}";
        let summary = summarize(src, ".rs");
        assert_eq!(summary, ParseSummary::lines_only(3));
    }

    #[test]
    fn non_text_input_becomes_error_marker_not_panic() {
        let src = "function a() {}\n\0\n";
        match summarize(src, ".js") {
            ParseSummary::Failed { error } => assert!(error.contains("NUL")),
            other => panic!("expected failed summary, got {other:?}"),
        }
    }

    #[test]
    fn line_count_matches_newline_count_plus_one() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 3);
    }
}

//! Single-line pattern occurrences.
//!
//! A [`LinePattern`] is a regex with one capture group (the inner type). Each
//! match on a line becomes an [`Occurrence`] carrying the matched text, the
//! captured inner signature and a symmetric context window.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::Location;
use crate::error::{AuditError, AuditResult};
use crate::scan::{SourceUnit, UnitKind};

/// Default number of context lines on each side of a match.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// `Arc<Mutex<Inner>>`, with `Inner` allowed one level of nested `<...>`.
/// Deeper nesting falls through to the second alternative, which stops at the
/// first `>>` and yields a truncated inner signature.
const ARC_MUTEX_PATTERN: &str = r"Arc<Mutex<([^<>]+(?:<[^<>]+>)?|[^>]+)>>";

/// A named single-line detection pattern.
#[derive(Debug, Clone)]
pub struct LinePattern {
    name: String,
    regex: Regex,
}

impl LinePattern {
    /// Compile a pattern. The regex must declare at least one capture group;
    /// group 1 is taken as the inner signature.
    pub fn new(name: impl Into<String>, pattern: &str) -> AuditResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| AuditError::invalid_argument(format!("bad pattern {pattern:?}: {e}")))?;
        if regex.captures_len() < 2 {
            return Err(AuditError::invalid_argument(format!(
                "pattern {pattern:?} has no capture group for the inner signature"
            )));
        }
        Ok(Self {
            name: name.into(),
            regex,
        })
    }

    /// The built-in `Arc<Mutex<T>>` pattern.
    pub fn arc_mutex() -> &'static LinePattern {
        static PATTERN: OnceLock<LinePattern> = OnceLock::new();
        PATTERN.get_or_init(|| LinePattern {
            name: "arc_mutex".to_string(),
            // SAFETY: constant pattern, covered by tests
            regex: Regex::new(ARC_MUTEX_PATTERN).expect("valid Arc<Mutex> pattern"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One located match of a [`LinePattern`].
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    pub location: Location,
    /// Kind of the unit the match was found in
    pub unit_kind: UnitKind,
    /// Exact substring that matched, e.g. `Arc<Mutex<Vec<u8>>>`
    pub matched_text: String,
    /// Capture group 1, e.g. `Vec<u8>`
    pub inner_signature: String,
    /// The whole matching line, trimmed
    pub line_content: String,
    /// Surrounding lines joined with `\n`; used only by secondary checks
    #[serde(skip_serializing)]
    pub context_window: String,
}

/// Find every match of `pattern` in `unit`, in textual order.
pub fn extract_occurrences(
    unit: &SourceUnit,
    pattern: &LinePattern,
    context_lines: usize,
) -> Vec<Occurrence> {
    let lines: Vec<&str> = unit.text.lines().collect();
    let mut found = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        for caps in pattern.regex.captures_iter(line) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let start = idx.saturating_sub(context_lines);
            let end = (idx + context_lines + 1).min(lines.len());

            found.push(Occurrence {
                location: Location {
                    path: unit.path.clone(),
                    line: idx + 1,
                },
                unit_kind: unit.kind,
                matched_text: whole.as_str().to_string(),
                inner_signature: inner.as_str().to_string(),
                line_content: line.trim().to_string(),
                context_window: lines[start..end].join("\n"),
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> SourceUnit {
        SourceUnit::new("src/state.rs", text)
    }

    #[test]
    fn test_simple_inner_type() {
        let u = unit("struct S {\n    flag: Arc<Mutex<bool>>,\n}\n");
        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 3);

        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].location.line, 2);
        assert_eq!(occ[0].inner_signature, "bool");
        assert_eq!(occ[0].matched_text, "Arc<Mutex<bool>>");
        assert_eq!(occ[0].line_content, "flag: Arc<Mutex<bool>>,");
    }

    #[test]
    fn test_one_level_of_nesting() {
        let u = unit("let rx: Arc<Mutex<mpsc::Receiver<Message>>> = todo!();");
        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 3);

        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].inner_signature, "mpsc::Receiver<Message>");
    }

    #[test]
    fn test_multiple_matches_per_line() {
        let u = unit("fn f(a: Arc<Mutex<u32>>, b: Arc<Mutex<String>>) {}");
        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 3);

        let inner: Vec<_> = occ.iter().map(|o| o.inner_signature.as_str()).collect();
        assert_eq!(inner, vec!["u32", "String"]);
        assert!(occ.iter().all(|o| o.location.line == 1));
    }

    #[test]
    fn test_context_window_is_symmetric_and_clamped() {
        let text = (1..=10)
            .map(|i| {
                if i == 5 {
                    "x: Arc<Mutex<u8>>".to_string()
                } else {
                    format!("line{i}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let u = unit(&text);

        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 2);
        assert_eq!(occ[0].context_window, "line3\nline4\nx: Arc<Mutex<u8>>\nline6\nline7");

        let u = unit("x: Arc<Mutex<u8>>\nnext");
        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 3);
        assert_eq!(occ[0].context_window, "x: Arc<Mutex<u8>>\nnext");
    }

    #[test]
    fn test_custom_pattern_requires_capture_group() {
        assert!(LinePattern::new("box_dyn", r"Box<dyn \w+>").is_err());

        let p = LinePattern::new("box_dyn", r"Box<dyn (\w+)>").unwrap();
        assert_eq!(p.name(), "box_dyn");
        let occ = extract_occurrences(&unit("let h: Box<dyn Handler> = x;"), &p, 0);
        assert_eq!(occ[0].inner_signature, "Handler");
        assert_eq!(occ[0].context_window, "let h: Box<dyn Handler> = x;");
    }

    #[test]
    fn test_deeper_nesting_is_truncated() {
        let u = unit("jobs: Arc<Mutex<Vec<Box<Job>>>>,");
        let occ = extract_occurrences(&u, LinePattern::arc_mutex(), 3);

        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].inner_signature, "Vec<Box<Job");
    }

    #[test]
    fn test_no_match_on_rwlock() {
        let u = unit("cache: Arc<RwLock<HashMap<String, u8>>>,");
        assert!(extract_occurrences(&u, LinePattern::arc_mutex(), 3).is_empty());
    }
}

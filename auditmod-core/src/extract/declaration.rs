//! Trait declaration extraction via balanced-brace scanning.
//!
//! Algorithm:
//! 1. A header regex anchored at line start finds
//!    `[pub[(scope)]] [unsafe] trait Name [<generics>] [: bounds] {`.
//! 2. From just after the header's `{`, a depth counter starts at 1; every
//!    `{` increments it, every `}` decrements it. The `}` that brings it to
//!    zero closes the body.
//! 3. No closing brace before end-of-text: the declaration is dropped.
//! 4. Members (`fn name`) and associated types (`type Name`) are counted line
//!    by line after stripping `//` comments.
//!
//! The counter is deliberately naive; see the module docs of
//! [`crate::extract`] for the consequences.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

use super::{LineIndex, Location};
use crate::scan::{SourceUnit, UnitKind};

/// Header: optional visibility (with optional scope), optional `unsafe`/`auto`,
/// `trait`, name, optional generics, anything up to the opening brace.
const TRAIT_HEADER_PATTERN: &str = r"(?m)^[ \t]*(?:pub(?:[ \t]*\([^)]*\))?[ \t]+)?(?:unsafe[ \t]+)?(?:auto[ \t]+)?trait[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*(<[^{;]*?>)?[^{;]*\{";

fn trait_header_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // SAFETY: constant pattern, covered by tests
    REGEX.get_or_init(|| Regex::new(TRAIT_HEADER_PATTERN).expect("valid trait header pattern"))
}

fn member_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\bfn[ \t]+([A-Za-z_][A-Za-z0-9_]*)").expect("valid member pattern")
    })
}

fn assoc_type_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\btype[ \t]+([A-Za-z_][A-Za-z0-9_]*)").expect("valid associated type pattern")
    })
}

/// One trait declaration with its body and structural facts.
#[derive(Debug, Clone, Serialize)]
pub struct DeclarationUnit {
    pub name: String,
    /// Line of the header
    pub location: Location,
    pub unit_kind: UnitKind,
    pub member_count: usize,
    /// Member names in textual order
    pub member_names: Vec<String>,
    pub associated_type_names: BTreeSet<String>,
    /// Header carries `<...>` generic or lifetime parameters
    pub is_parameterized: bool,
    /// Trimmed text between the balanced braces
    #[serde(skip_serializing)]
    pub body_text: String,
}

/// Byte offset of the `}` closing a block whose body starts at `start`.
///
/// `start` is the position just after the opening `{`; depth starts at 1.
/// Returns `None` if the text ends first.
pub fn find_block_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if start > bytes.len() {
        return None;
    }

    let mut depth: usize = 1;
    for (offset, byte) in bytes[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Text of `line` before the first `//` that is not preceded by a backslash.
pub fn strip_line_comment(line: &str) -> &str {
    let mut search_from = 0;
    while let Some(found) = line[search_from..].find("//") {
        let at = search_from + found;
        if at > 0 && line.as_bytes()[at - 1] == b'\\' {
            search_from = at + 2;
            continue;
        }
        return &line[..at];
    }
    line
}

/// Extract all trait declarations from a unit, in textual order.
pub fn extract_trait_declarations(unit: &SourceUnit) -> Vec<DeclarationUnit> {
    let text = unit.text.as_str();
    let index = LineIndex::new(text);
    let mut declarations = Vec::new();

    for caps in trait_header_regex().captures_iter(text) {
        let (Some(header), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let line = index.line_of(header.start());

        let Some(end) = find_block_end(text, header.end()) else {
            debug!(
                path = %unit.path.display(),
                line,
                name = name.as_str(),
                "unbalanced trait body, dropping declaration"
            );
            continue;
        };

        let body = &text[header.end()..end];
        let mut member_names = Vec::new();
        let mut associated_type_names = BTreeSet::new();

        for body_line in body.lines().map(strip_line_comment) {
            member_names.extend(
                member_regex()
                    .captures_iter(body_line)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            );
            associated_type_names.extend(
                assoc_type_regex()
                    .captures_iter(body_line)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            );
        }

        declarations.push(DeclarationUnit {
            name: name.as_str().to_string(),
            location: Location {
                path: unit.path.clone(),
                line,
            },
            unit_kind: unit.kind,
            member_count: member_names.len(),
            member_names,
            associated_type_names,
            is_parameterized: caps.get(2).is_some(),
            body_text: body.trim().to_string(),
        });
    }

    declarations
}

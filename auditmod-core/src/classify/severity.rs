//! Severity assessment for lock occurrences.
//!
//! A fixed list of independent heuristic checks looks at the occurrence's
//! inner type, its line, its context window and the full text of its unit.
//! Each check that fires contributes at most one issue and at most one
//! recommendation; severity depends only on the number of issues.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::{Severity, Thresholds};
use crate::extract::Occurrence;

/// Inner types that have (or nearly have) an atomic counterpart.
const SIMPLE_TYPES: &[&str] = &[
    "bool", "i32", "i64", "u32", "u64", "f32", "f64", "usize", "isize",
];

/// Lowercase substrings that suggest the unit actually shares across threads.
const CONCURRENCY_KEYWORDS: &[&str] = &["spawn", "thread::", "tokio::spawn", "async", "send", "sync"];

struct ContextPatterns {
    lock: Regex,
    reads: Vec<Regex>,
}

fn context_patterns() -> &'static ContextPatterns {
    static PATTERNS: OnceLock<ContextPatterns> = OnceLock::new();
    // SAFETY: constant patterns, covered by tests
    PATTERNS.get_or_init(|| ContextPatterns {
        lock: Regex::new(r"\.lock\(\)\.(?:unwrap\(\)|expect)").expect("valid lock pattern"),
        reads: [
            r"\.lock\(\).*\.get\(",
            r"\.lock\(\).*\.contains",
            r"\.lock\(\).*\.iter\(",
            r"let .* = .*\.lock\(\)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid read pattern"))
        .collect(),
    })
}

/// Inputs available to a check.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceInput<'a> {
    pub occurrence: &'a Occurrence,
    /// Full text of the unit containing the occurrence
    pub unit_text: &'a str,
    /// `unit_text` lowercased, computed once per unit
    pub unit_lower: &'a str,
    pub thresholds: &'a Thresholds,
}

/// What a fired check contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finding {
    pub issue: Option<String>,
    pub recommendation: Option<String>,
}

/// One independent heuristic check.
pub struct OccurrenceCheck {
    pub id: &'static str,
    pub evaluate: fn(&OccurrenceInput<'_>) -> Option<Finding>,
}

/// The check list, in evaluation order.
pub static OCCURRENCE_CHECKS: &[OccurrenceCheck] = &[
    OccurrenceCheck {
        id: "primitive_inner_type",
        evaluate: check_primitive,
    },
    OccurrenceCheck {
        id: "clone_hotspot",
        evaluate: check_clone_hotspot,
    },
    OccurrenceCheck {
        id: "read_heavy",
        evaluate: check_read_heavy,
    },
    OccurrenceCheck {
        id: "no_concurrency",
        evaluate: check_no_concurrency,
    },
    OccurrenceCheck {
        id: "channel_candidate",
        evaluate: check_channel_candidate,
    },
    OccurrenceCheck {
        id: "created_and_cloned",
        evaluate: check_created_and_cloned,
    },
];

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn check_primitive(input: &OccurrenceInput<'_>) -> Option<Finding> {
    let inner = input.occurrence.inner_signature.as_str();
    if !SIMPLE_TYPES.iter().any(|t| inner.starts_with(t)) {
        return None;
    }
    Some(Finding {
        issue: Some("Simple atomic type - consider using atomic primitives".to_string()),
        recommendation: Some(format!("Use Atomic{} instead", capitalize(inner))),
    })
}

fn check_clone_hotspot(input: &OccurrenceInput<'_>) -> Option<Finding> {
    let clones = input.unit_text.matches(".clone()").count();
    (clones > input.thresholds.clone_hotspot).then(|| Finding {
        issue: Some(format!(
            "File has {clones} .clone() calls - possible excessive sharing"
        )),
        recommendation: None,
    })
}

fn check_read_heavy(input: &OccurrenceInput<'_>) -> Option<Finding> {
    let patterns = context_patterns();
    let context = input.occurrence.context_window.as_str();

    let locks = patterns.lock.find_iter(context).count();
    let reads: usize = patterns
        .reads
        .iter()
        .map(|p| p.find_iter(context).count())
        .sum();

    ((reads as f64) > (locks as f64) * input.thresholds.read_heavy_ratio).then(|| Finding {
        issue: Some("Appears to be read-heavy".to_string()),
        recommendation: Some("Consider Arc<RwLock<T>> for better read concurrency".to_string()),
    })
}

fn check_no_concurrency(input: &OccurrenceInput<'_>) -> Option<Finding> {
    if CONCURRENCY_KEYWORDS.iter().any(|k| input.unit_lower.contains(k)) {
        return None;
    }
    Some(Finding {
        issue: Some("No obvious threading/async usage in file".to_string()),
        recommendation: Some(
            "Might not need Arc - consider Rc<RefCell<T>> or plain ownership".to_string(),
        ),
    })
}

fn check_channel_candidate(input: &OccurrenceInput<'_>) -> Option<Finding> {
    let inner = input.occurrence.inner_signature.to_lowercase();
    let mentions_channel = inner.contains("sender")
        || inner.contains("receiver")
        || input.unit_lower.contains("channel");
    mentions_channel.then(|| Finding {
        issue: None,
        recommendation: Some("Consider using channels for producer/consumer pattern".to_string()),
    })
}

fn check_created_and_cloned(input: &OccurrenceInput<'_>) -> Option<Finding> {
    let line = input.occurrence.line_content.as_str();
    (line.contains(".clone()") && line.contains("Arc::new(Mutex::new")).then(|| Finding {
        issue: Some("Created and immediately cloned - might be defensive programming".to_string()),
        recommendation: None,
    })
}

/// Severity plus the issues and recommendations behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityAssessment {
    pub severity: Severity,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Run every check against one occurrence.
///
/// `unit_lower` must be `unit_text.to_lowercase()`; callers assessing many
/// occurrences of one unit compute it once.
pub fn assess_occurrence(
    occurrence: &Occurrence,
    unit_text: &str,
    unit_lower: &str,
    thresholds: &Thresholds,
) -> SeverityAssessment {
    let input = OccurrenceInput {
        occurrence,
        unit_text,
        unit_lower,
        thresholds,
    };

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    for finding in OCCURRENCE_CHECKS.iter().filter_map(|c| (c.evaluate)(&input)) {
        issues.extend(finding.issue);
        recommendations.extend(finding.recommendation);
    }

    SeverityAssessment {
        severity: thresholds.severity(issues.len()),
        issues,
        recommendations,
    }
}

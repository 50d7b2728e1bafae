//! Rule-based classification of extracted signals.
//!
//! Two independent classifiers:
//!
//! - [`classify_declaration`]: trait declaration × usage profile →
//!   [`Category`] with ordered keep/remove reasons. Driven by the ordered
//!   [`DECLARATION_RULES`] list; every rule is evaluated, none short-circuits.
//! - [`assess_occurrence`]: lock occurrence × unit text → [`Severity`] with
//!   issues and recommendations, driven by [`OCCURRENCE_CHECKS`].
//!
//! Both are pure functions of their inputs and the [`Thresholds`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │ DeclarationUnit  │   │   UsageProfile   │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │  DECLARATION_RULES   │  keep / remove reasons
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │ Thresholds::decide   │  DEFINITELY_REMOVE / MAYBE_REMOVE / KEEP_AS_IS
//!          └──────────────────────┘
//! ```

pub mod rules;
pub mod severity;

use serde::Serialize;
use std::fmt;

pub use rules::{classify_declaration, ClassificationResult, DeclarationRule, Verdict, DECLARATION_RULES};
pub use severity::{
    assess_occurrence, Finding, OccurrenceCheck, OccurrenceInput, SeverityAssessment,
    OCCURRENCE_CHECKS,
};

/// Tunable decision thresholds.
///
/// Defaults: 3 issues for `HIGH`, at most 1 keep and at least 2 remove reasons
/// for `MAYBE_REMOVE`, more than 2 bound uses as a keep reason, more than 5
/// clones as a hotspot, and a read/lock ratio of 0.7 for read-heavy context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Issues needed for `HIGH` severity
    pub high_min_issues: usize,
    /// `MAYBE_REMOVE` allows at most this many keep reasons
    pub maybe_remove_max_keep: usize,
    /// `MAYBE_REMOVE` needs at least this many remove reasons
    pub maybe_remove_min_remove: usize,
    /// Bound uses above this count are a keep reason
    pub bound_use_keep_above: usize,
    /// `.clone()` calls in a unit above this count are an issue
    pub clone_hotspot: usize,
    /// Context is read-heavy when reads > locks × ratio
    pub read_heavy_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_min_issues: 3,
            maybe_remove_max_keep: 1,
            maybe_remove_min_remove: 2,
            bound_use_keep_above: 2,
            clone_hotspot: 5,
            read_heavy_ratio: 0.7,
        }
    }
}

impl Thresholds {
    /// Turn reason counts into a category. Ties resolve to `KEEP_AS_IS`.
    pub fn decide(&self, keep: usize, remove: usize) -> Category {
        if keep == 0 && remove > 0 {
            Category::DefinitelyRemove
        } else if keep <= self.maybe_remove_max_keep && remove >= self.maybe_remove_min_remove {
            Category::MaybeRemove
        } else {
            Category::KeepAsIs
        }
    }

    /// Turn an issue count into a severity.
    pub fn severity(&self, issues: usize) -> Severity {
        if issues >= self.high_min_issues {
            Severity::High
        } else if issues >= 1 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Outcome for a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    DefinitelyRemove,
    MaybeRemove,
    KeepAsIs,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::DefinitelyRemove, Self::MaybeRemove, Self::KeepAsIs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DefinitelyRemove => "DEFINITELY_REMOVE",
            Self::MaybeRemove => "MAYBE_REMOVE",
            Self::KeepAsIs => "KEEP_AS_IS",
        }
    }

    /// Whether the category proposes removal.
    pub fn is_remove_candidate(self) -> bool {
        matches!(self, Self::DefinitelyRemove | Self::MaybeRemove)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for a lock occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Numeric rank, higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

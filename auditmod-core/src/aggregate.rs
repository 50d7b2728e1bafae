//! Grouping, ranking and report assembly.
//!
//! Rankings are by descending count; ties keep first-seen order. Findings
//! arrive in corpus order (units sorted by path, matches in textual order), so
//! every report built here is deterministic for a given corpus.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::classify::{Category, ClassificationResult, Severity, SeverityAssessment};
use crate::extract::{DeclarationUnit, Occurrence};
use crate::profile::UsageProfile;
use crate::scan::{SkippedUnit, UnitKind};

/// Group items by key and rank groups by size.
///
/// Sorting is stable, so equal-sized groups stay in first-seen order.
pub fn rank_by<'a, T, K, F>(items: impl IntoIterator<Item = &'a T>, key: F) -> Vec<(K, Vec<&'a T>)>
where
    T: 'a,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

    for item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups
}

/// One file in a top-files ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCount {
    pub file: PathBuf,
    pub count: usize,
    pub is_test: bool,
}

/// One row of a by-type / by-name breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

fn top_files<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    path: impl Fn(&T) -> (PathBuf, UnitKind),
    limit: usize,
) -> Vec<FileCount> {
    rank_by(items, |t| path(t))
        .into_iter()
        .take(limit)
        .map(|((file, kind), group)| FileCount {
            file,
            count: group.len(),
            is_test: kind.is_test(),
        })
        .collect()
}

fn breakdown<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> String,
    limit: usize,
) -> (usize, Vec<GroupCount>) {
    let ranked = rank_by(items, key);
    let distinct = ranked.len();
    let rows = ranked
        .into_iter()
        .take(limit)
        .map(|(key, group)| GroupCount {
            key,
            count: group.len(),
        })
        .collect();
    (distinct, rows)
}

// ============================================================================
// Lock audit
// ============================================================================

/// An occurrence with its severity assessment.
#[derive(Debug, Clone)]
pub struct LockFinding {
    pub occurrence: Occurrence,
    pub assessment: SeverityAssessment,
}

/// Per-occurrence record in the lock report.
#[derive(Debug, Clone, Serialize)]
pub struct LockRecord {
    pub file: PathBuf,
    pub line: usize,
    #[serde(rename = "type")]
    pub inner_type: String,
    pub line_content: String,
    pub severity: Severity,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LockSummary {
    pub total: usize,
    pub test: usize,
    pub production: usize,
    /// Production occurrences per severity
    pub by_severity: BTreeMap<Severity, usize>,
    /// Distinct inner types among production occurrences
    pub unique_types: usize,
}

/// Aggregate report for the `Arc<Mutex<T>>` pass.
#[derive(Debug, Clone, Serialize)]
pub struct LockAuditReport {
    pub summary: LockSummary,
    pub production_usages: Vec<LockRecord>,
    pub top_files: Vec<FileCount>,
    pub by_type: Vec<GroupCount>,
}

impl LockAuditReport {
    /// Production records with the given severity, in corpus order.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &LockRecord> {
        self.production_usages
            .iter()
            .filter(move |r| r.severity == severity)
    }
}

pub fn build_lock_report(findings: &[LockFinding], top_n: usize, top_groups: usize) -> LockAuditReport {
    let production: Vec<&LockFinding> = findings
        .iter()
        .filter(|f| !f.occurrence.unit_kind.is_test())
        .collect();

    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for f in &production {
        *by_severity.entry(f.assessment.severity).or_default() += 1;
    }

    let (unique_types, by_type) = breakdown(
        production.iter().copied(),
        |f| f.occurrence.inner_signature.clone(),
        top_groups,
    );

    let production_usages = production
        .iter()
        .map(|f| LockRecord {
            file: f.occurrence.location.path.clone(),
            line: f.occurrence.location.line,
            inner_type: f.occurrence.inner_signature.clone(),
            line_content: f.occurrence.line_content.clone(),
            severity: f.assessment.severity,
            issues: f.assessment.issues.clone(),
            recommendations: f.assessment.recommendations.clone(),
        })
        .collect();

    LockAuditReport {
        summary: LockSummary {
            total: findings.len(),
            test: findings.len() - production.len(),
            production: production.len(),
            by_severity,
            unique_types,
        },
        production_usages,
        top_files: top_files(
            findings,
            |f| (f.occurrence.location.path.clone(), f.occurrence.unit_kind),
            top_n,
        ),
        by_type,
    }
}

// ============================================================================
// Trait audit
// ============================================================================

/// A declaration with its usage profile and classification.
#[derive(Debug, Clone)]
pub struct TraitFinding {
    pub declaration: DeclarationUnit,
    pub usage: UsageProfile,
    pub classification: ClassificationResult,
}

/// Per-declaration record in the trait report.
#[derive(Debug, Clone, Serialize)]
pub struct TraitRecord {
    pub file: PathBuf,
    pub line: usize,
    pub name: String,
    pub member_count: usize,
    pub members: Vec<String>,
    pub category: Category,
    pub keep_reasons: Vec<String>,
    pub remove_reasons: Vec<String>,
    pub implementation_count: usize,
    pub dynamic_use_count: usize,
    pub bound_use_count: usize,
}

impl From<&TraitFinding> for TraitRecord {
    fn from(f: &TraitFinding) -> Self {
        Self {
            file: f.declaration.location.path.clone(),
            line: f.declaration.location.line,
            name: f.declaration.name.clone(),
            member_count: f.declaration.member_count,
            members: f.declaration.member_names.clone(),
            category: f.classification.category,
            keep_reasons: f.classification.keep_reasons.clone(),
            remove_reasons: f.classification.remove_reasons.clone(),
            implementation_count: f.usage.implementation_count,
            dynamic_use_count: f.usage.dynamic_use_count,
            bound_use_count: f.usage.bound_use_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraitSummary {
    pub total: usize,
    pub test: usize,
    pub production: usize,
    /// Production declarations with exactly one member
    pub single_member: usize,
    /// Production declarations per category
    pub by_category: BTreeMap<Category, usize>,
    /// Distinct names among production declarations
    pub unique_names: usize,
}

/// Aggregate report for the trait pass.
#[derive(Debug, Clone, Serialize)]
pub struct TraitAuditReport {
    pub summary: TraitSummary,
    pub declarations: Vec<TraitRecord>,
    /// Production declarations classified `DEFINITELY_REMOVE` or `MAYBE_REMOVE`
    pub remove_candidates: Vec<TraitRecord>,
    pub top_files: Vec<FileCount>,
    pub by_name: Vec<GroupCount>,
}

impl TraitAuditReport {
    pub fn with_category(&self, category: Category) -> impl Iterator<Item = &TraitRecord> {
        self.declarations
            .iter()
            .filter(move |r| r.category == category)
    }
}

pub fn build_trait_report(findings: &[TraitFinding], top_n: usize, top_groups: usize) -> TraitAuditReport {
    let production: Vec<&TraitFinding> = findings
        .iter()
        .filter(|f| !f.declaration.unit_kind.is_test())
        .collect();

    let mut by_category: BTreeMap<Category, usize> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();
    for f in &production {
        *by_category.entry(f.classification.category).or_default() += 1;
    }

    let (unique_names, by_name) = breakdown(
        production.iter().copied(),
        |f| f.declaration.name.clone(),
        top_groups,
    );

    let declarations: Vec<TraitRecord> = production.iter().map(|f| TraitRecord::from(*f)).collect();
    let remove_candidates = declarations
        .iter()
        .filter(|r| r.category.is_remove_candidate())
        .cloned()
        .collect();

    TraitAuditReport {
        summary: TraitSummary {
            total: findings.len(),
            test: findings.len() - production.len(),
            production: production.len(),
            single_member: production
                .iter()
                .filter(|f| f.declaration.member_count == 1)
                .count(),
            by_category,
            unique_names,
        },
        declarations,
        remove_candidates,
        top_files: top_files(
            findings,
            |f| (f.declaration.location.path.clone(), f.declaration.unit_kind),
            top_n,
        ),
        by_name,
    }
}

// ============================================================================
// Whole run
// ============================================================================

/// Serialize a path that may not be UTF-8, replacing invalid sequences.
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Serialize one report section, or its `Debug` string if it cannot be
/// represented. Other sections are unaffected.
fn section_or_string<T, S>(section: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Debug,
    S: Serializer,
{
    match serde_json::to_value(section) {
        Ok(value) => value.serialize(serializer),
        Err(e) => {
            warn!(error = %e, "report section not serializable, using string fallback");
            serializer.serialize_str(&format!("{section:?}"))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    #[serde(serialize_with = "lossy_path")]
    pub root: PathBuf,
    pub units: usize,
    pub test_units: usize,
    pub production_units: usize,
    pub skipped: Vec<SkippedUnit>,
}

/// Everything one run produced. Sections not requested stay `None`.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    #[serde(serialize_with = "section_or_string")]
    pub corpus: CorpusSummary,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "section_or_string")]
    pub locks: Option<LockAuditReport>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "section_or_string")]
    pub traits: Option<TraitAuditReport>,
    #[cfg(feature = "survey")]
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "section_or_string")]
    pub survey: Option<crate::survey::SurveyReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_count_then_first_seen() {
        let items = ["b", "a", "c", "a", "c", "d"];
        let ranked = rank_by(items.iter(), |s| s.to_string());
        let keys: Vec<_> = ranked.iter().map(|(k, g)| (k.as_str(), g.len())).collect();
        assert_eq!(keys, vec![("a", 2), ("c", 2), ("b", 1), ("d", 1)]);
    }

    #[derive(Debug)]
    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[derive(Serialize)]
    struct Sections {
        #[serde(serialize_with = "section_or_string")]
        good: Vec<u8>,
        #[serde(serialize_with = "section_or_string")]
        bad: Unrepresentable,
    }

    #[test]
    fn test_bad_section_becomes_string_in_place() {
        let json = serde_json::to_value(Sections {
            good: vec![1, 2],
            bad: Unrepresentable,
        })
        .unwrap();
        assert_eq!(json["good"], serde_json::json!([1, 2]));
        assert_eq!(json["bad"], "Unrepresentable");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_root_serializes_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let summary = CorpusSummary {
            root: PathBuf::from(OsStr::from_bytes(b"/tmp/bad\xff")),
            units: 0,
            test_units: 0,
            production_units: 0,
            skipped: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["root"], "/tmp/bad\u{FFFD}");
    }

    #[test]
    fn test_rank_by_empty() {
        let items: Vec<u8> = Vec::new();
        assert!(rank_by(items.iter(), |x| *x).is_empty());
    }

    #[test]
    fn test_breakdown_counts_distinct_before_truncation() {
        let items = ["x", "y", "z", "x"];
        let (distinct, rows) = breakdown(items.iter(), |s| s.to_string(), 2);
        assert_eq!(distinct, 3);
        assert_eq!(
            rows,
            vec![
                GroupCount { key: "x".into(), count: 2 },
                GroupCount { key: "y".into(), count: 1 },
            ]
        );
    }
}

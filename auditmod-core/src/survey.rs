//! Corpus-wide lexical statistics.
//!
//! A companion pass to the lock and trait audits: marker comments, clone and
//! allocation hot spots, `Box<dyn>` usage, `#[must_use]` coverage on
//! `Result`-returning functions, async usage and public API surface. All
//! counts are plain text matches and share the limitations of the rest of the
//! crate.

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::aggregate::FileCount;
use crate::scan::{SourceUnit, UnitKind};

/// Comment markers, in report order.
pub const MARKERS: &[&str] = &["TODO", "FIXME", "XXX", "HACK"];

/// Units with more `.clone()` calls than this are hot spots.
pub const CLONE_HOTSPOT: usize = 10;
/// Units with more string allocations than this are hot spots.
pub const ALLOCATION_HOTSPOT: usize = 20;
/// Hot-spot lists are cut to this length.
pub const HOTSPOT_LIMIT: usize = 20;

/// String-allocation idioms, counted literally.
const ALLOCATION_PATTERNS: &[&str] = &[".to_string()", ".to_owned()", "String::from(", "format!("];

struct SurveyPatterns {
    box_dyn_error: Regex,
    result_fn: Regex,
    async_fn: Regex,
    any_fn: Regex,
    pub_fn: Regex,
    pub_crate_fn: Regex,
    pub_struct: Regex,
    pub_enum: Regex,
    pub_trait: Regex,
}

fn patterns() -> &'static SurveyPatterns {
    static PATTERNS: OnceLock<SurveyPatterns> = OnceLock::new();
    // SAFETY: constant patterns, covered by tests
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid survey pattern");
        SurveyPatterns {
            box_dyn_error: re(r"Result<.*Box<dyn.*Error"),
            result_fn: re(r"fn\s+\w+[^{]*->\s*Result"),
            async_fn: re(r"async\s+fn"),
            any_fn: re(r"\bfn\s+"),
            pub_fn: re(r"\bpub\s+fn\s+"),
            pub_crate_fn: re(r"\bpub\(crate\)\s+fn\s+"),
            pub_struct: re(r"\bpub\s+struct\s+"),
            pub_enum: re(r"\bpub\s+enum\s+"),
            pub_trait: re(r"\bpub\s+trait\s+"),
        }
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Overview {
    pub total_files: usize,
    pub production_files: usize,
    pub test_files: usize,
}

/// One marker hit.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerComment {
    pub file: PathBuf,
    pub line: usize,
    pub marker: &'static str,
    /// Text after `//` when the line has a comment, else the trimmed line
    pub comment: String,
    pub is_test: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MarkerSummary {
    pub total: usize,
    pub by_marker: BTreeMap<&'static str, usize>,
    pub details: Vec<MarkerComment>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CloneUsage {
    pub total: usize,
    pub by_file: BTreeMap<PathBuf, usize>,
    pub hot_spots: Vec<FileCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxFile {
    pub file: PathBuf,
    pub box_dyn: usize,
    pub box_dyn_error: usize,
    pub is_test: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoxUsage {
    pub box_dyn: usize,
    pub box_dyn_error: usize,
    pub files: Vec<BoxFile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StringAllocations {
    pub total: usize,
    pub by_pattern: BTreeMap<&'static str, usize>,
    pub hot_spots: Vec<FileCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MustUseGap {
    pub file: PathBuf,
    pub result_functions: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MustUseCoverage {
    pub result_functions: usize,
    pub must_use_count: usize,
    /// `must_use_count / result_functions × 100`, 0 when there are no such functions
    pub coverage_percent: f64,
    pub missing: Vec<MustUseGap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AsyncFile {
    pub file: PathBuf,
    pub async_functions: usize,
    pub await_calls: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AsyncUsage {
    pub async_functions: usize,
    pub await_calls: usize,
    pub files: Vec<AsyncFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiSurface {
    pub pub_fn: usize,
    pub pub_crate_fn: usize,
    pub private_fn: usize,
    pub pub_struct: usize,
    pub pub_enum: usize,
    pub pub_trait: usize,
}

/// Full survey output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SurveyReport {
    pub overview: Overview,
    pub markers: MarkerSummary,
    pub clone_usage: CloneUsage,
    pub box_usage: BoxUsage,
    pub string_allocations: StringAllocations,
    pub must_use: MustUseCoverage,
    pub async_usage: AsyncUsage,
    pub api_surface: ApiSurface,
}

/// Everything counted in one unit.
struct UnitStats {
    path: PathBuf,
    kind: UnitKind,
    markers: Vec<(usize, &'static str, String)>,
    clones: usize,
    box_dyn: usize,
    box_dyn_error: usize,
    allocations: Vec<usize>,
    result_fns: usize,
    must_use: usize,
    async_fns: usize,
    awaits: usize,
    api: ApiSurface,
}

fn marker_comment(line: &str) -> String {
    let trimmed = line.trim();
    match trimmed.split_once("//") {
        Some((_, comment)) => comment.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn unit_stats(unit: &SourceUnit) -> UnitStats {
    let p = patterns();
    let text = unit.text.as_str();

    let mut markers = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let upper = line.to_uppercase();
        for marker in MARKERS {
            if upper.contains(marker) {
                markers.push((idx + 1, *marker, marker_comment(line)));
            }
        }
    }

    let any_fn = p.any_fn.find_iter(text).count();
    let pub_fn = p.pub_fn.find_iter(text).count();
    let pub_crate_fn = p.pub_crate_fn.find_iter(text).count();

    UnitStats {
        path: unit.path.clone(),
        kind: unit.kind,
        markers,
        clones: text.matches(".clone()").count(),
        box_dyn: text.matches("Box<dyn").count(),
        box_dyn_error: p.box_dyn_error.find_iter(text).count(),
        allocations: ALLOCATION_PATTERNS
            .iter()
            .map(|pat| text.matches(pat).count())
            .collect(),
        result_fns: p.result_fn.find_iter(text).count(),
        must_use: text.matches("#[must_use]").count(),
        async_fns: p.async_fn.find_iter(text).count(),
        awaits: text.matches(".await").count(),
        api: ApiSurface {
            pub_fn,
            pub_crate_fn,
            private_fn: any_fn.saturating_sub(pub_fn + pub_crate_fn),
            pub_struct: p.pub_struct.find_iter(text).count(),
            pub_enum: p.pub_enum.find_iter(text).count(),
            pub_trait: p.pub_trait.find_iter(text).count(),
        },
    }
}

fn hot_spots(counts: Vec<FileCount>, above: usize) -> Vec<FileCount> {
    let mut hot: Vec<FileCount> = counts.into_iter().filter(|c| c.count > above).collect();
    hot.sort_by(|a, b| b.count.cmp(&a.count));
    hot.truncate(HOTSPOT_LIMIT);
    hot
}

/// Survey every unit. Units are expected in path order.
pub fn survey(units: &[SourceUnit]) -> SurveyReport {
    let stats: Vec<UnitStats> = units.par_iter().map(unit_stats).collect();

    let mut report = SurveyReport::default();
    report.overview.total_files = units.len();
    report.overview.test_files = units.iter().filter(|u| u.kind.is_test()).count();
    report.overview.production_files = units.len() - report.overview.test_files;

    for marker in MARKERS {
        report.markers.by_marker.insert(*marker, 0);
    }
    for pat in ALLOCATION_PATTERNS {
        report.string_allocations.by_pattern.insert(*pat, 0);
    }

    let mut clone_counts = Vec::new();
    let mut allocation_counts = Vec::new();

    for s in stats {
        let is_test = s.kind.is_test();

        for (line, marker, comment) in s.markers {
            *report.markers.by_marker.entry(marker).or_default() += 1;
            report.markers.details.push(MarkerComment {
                file: s.path.clone(),
                line,
                marker,
                comment,
                is_test,
            });
        }

        if s.clones > 0 {
            report.clone_usage.total += s.clones;
            report.clone_usage.by_file.insert(s.path.clone(), s.clones);
            clone_counts.push(FileCount {
                file: s.path.clone(),
                count: s.clones,
                is_test,
            });
        }

        if s.box_dyn > 0 || s.box_dyn_error > 0 {
            report.box_usage.box_dyn += s.box_dyn;
            report.box_usage.box_dyn_error += s.box_dyn_error;
            report.box_usage.files.push(BoxFile {
                file: s.path.clone(),
                box_dyn: s.box_dyn,
                box_dyn_error: s.box_dyn_error,
                is_test,
            });
        }

        let unit_allocations: usize = s.allocations.iter().sum();
        for (pat, count) in ALLOCATION_PATTERNS.iter().zip(&s.allocations) {
            *report.string_allocations.by_pattern.entry(*pat).or_default() += count;
        }
        report.string_allocations.total += unit_allocations;
        allocation_counts.push(FileCount {
            file: s.path.clone(),
            count: unit_allocations,
            is_test,
        });

        report.must_use.result_functions += s.result_fns;
        report.must_use.must_use_count += s.must_use;
        if s.result_fns > 0 && s.must_use == 0 {
            report.must_use.missing.push(MustUseGap {
                file: s.path.clone(),
                result_functions: s.result_fns,
            });
        }

        report.async_usage.async_functions += s.async_fns;
        report.async_usage.await_calls += s.awaits;
        if s.async_fns > 0 || s.awaits > 0 {
            report.async_usage.files.push(AsyncFile {
                file: s.path.clone(),
                async_functions: s.async_fns,
                await_calls: s.awaits,
            });
        }

        let api = &mut report.api_surface;
        api.pub_fn += s.api.pub_fn;
        api.pub_crate_fn += s.api.pub_crate_fn;
        api.private_fn += s.api.private_fn;
        api.pub_struct += s.api.pub_struct;
        api.pub_enum += s.api.pub_enum;
        api.pub_trait += s.api.pub_trait;
    }

    report.markers.total = report.markers.details.len();
    report.clone_usage.hot_spots = hot_spots(clone_counts, CLONE_HOTSPOT);
    report.string_allocations.hot_spots = hot_spots(allocation_counts, ALLOCATION_HOTSPOT);
    if report.must_use.result_functions > 0 {
        report.must_use.coverage_percent =
            report.must_use.must_use_count as f64 / report.must_use.result_functions as f64 * 100.0;
    }

    report
}

//! Output formatting - plaintext and JSON.
//!
//! Renderers take an [`AuditReport`] and never fail on its contents. A report
//! section that cannot be serialized is replaced in place by its string
//! rendering, and plain text only fails when the writer does.

use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::aggregate::{AuditReport, FileCount, GroupCount, LockAuditReport, TraitAuditReport};
use crate::classify::{Category, Severity};
use crate::error::{AuditError, AuditResult, IoResultExt};
use crate::scan::UnitKind;

/// Limits for human-facing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportOptions {
    /// Files listed in the top-files ranking
    pub top_files: usize,
    /// Records shown per severity/category group before `... and N more`
    pub preview: usize,
    /// Rows in the by-type / by-name breakdown
    pub top_groups: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_files: 10,
            preview: 5,
            top_groups: 15,
        }
    }
}

/// Pretty JSON for any report value.
///
/// [`AuditReport`] sections fall back individually, so for a full report this
/// always succeeds. Any other value that fails as a whole becomes an object
/// carrying its `Debug` rendering.
pub fn to_json<T: Serialize + Debug>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "JSON serialization failed, using string fallback");
            json!({
                "serialization_error": e.to_string(),
                "report": format!("{value:?}"),
            })
            .to_string()
        }
    }
}

/// Prints the report as JSON on stdout.
pub fn print_json(report: &AuditReport) {
    println!("{}", to_json(report));
}

/// Prints the report as plain text on stdout.
pub fn print_plain(report: &AuditReport, opts: &ReportOptions) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = write_plain(&mut out, report, opts) {
        warn!(error = %e, "failed to write plain report");
    }
}

/// Writes the report as JSON to `path`.
pub fn save_report(path: &Path, report: &AuditReport) -> AuditResult<()> {
    if path.is_dir() {
        return Err(AuditError::report(format!(
            "report path is a directory: {}",
            path.display()
        )));
    }
    fs::write(path, to_json(report)).with_path(path)?;
    info!(path = %path.display(), "report saved");
    Ok(())
}

const RULE: &str = "================================================================";

fn heading(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}

/// Writes the whole report as plain text.
pub fn write_plain(out: &mut impl Write, report: &AuditReport, opts: &ReportOptions) -> io::Result<()> {
    let corpus = &report.corpus;
    writeln!(out, "Corpus: {}", corpus.root.display())?;
    writeln!(
        out,
        "Units: {} ({} production, {} test)",
        corpus.units, corpus.production_units, corpus.test_units
    )?;
    if !corpus.skipped.is_empty() {
        writeln!(out, "Skipped units ({}):", corpus.skipped.len())?;
        for s in &corpus.skipped {
            writeln!(out, "  - {}: {}", s.path.display(), s.reason)?;
        }
    }

    if let Some(locks) = &report.locks {
        writeln!(out)?;
        write_lock_report(out, locks, opts)?;
    }
    if let Some(traits) = &report.traits {
        writeln!(out)?;
        write_trait_report(out, traits, opts)?;
    }
    #[cfg(feature = "survey")]
    if let Some(survey) = &report.survey {
        writeln!(out)?;
        write_survey(out, survey)?;
    }
    Ok(())
}

fn write_top_files(out: &mut impl Write, files: &[FileCount], unit: &str) -> io::Result<()> {
    writeln!(out, "Top files:")?;
    if files.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for f in files {
        let kind = if f.is_test { UnitKind::Test } else { UnitKind::Production };
        let tag = kind.tag();
        writeln!(out, "  {tag} {}: {} {unit}", f.file.display(), f.count)?;
    }
    Ok(())
}

fn write_breakdown(out: &mut impl Write, title: &str, rows: &[GroupCount]) -> io::Result<()> {
    writeln!(out, "{title}:")?;
    for row in rows {
        writeln!(out, "  {}: {}", row.key, row.count)?;
    }
    Ok(())
}

fn write_more(out: &mut impl Write, total: usize, shown: usize) -> io::Result<()> {
    if total > shown {
        writeln!(out, "  ... and {} more", total - shown)?;
    }
    Ok(())
}

pub fn write_lock_report(out: &mut impl Write, report: &LockAuditReport, opts: &ReportOptions) -> io::Result<()> {
    let s = &report.summary;
    heading(out, "Arc<Mutex<T>> AUDIT")?;
    writeln!(out, "Total usages: {}", s.total)?;
    writeln!(out, "  Production: {}", s.production)?;
    writeln!(out, "  Test: {}", s.test)?;
    writeln!(out, "Distinct inner types: {}", s.unique_types)?;
    writeln!(out)?;

    writeln!(out, "Production usages by severity:")?;
    for (severity, count) in &s.by_severity {
        writeln!(out, "  {severity}: {count}")?;
    }
    writeln!(out)?;
    write_top_files(out, &report.top_files, "usages")?;

    for severity in Severity::ALL {
        let records: Vec<_> = report.with_severity(severity).collect();
        if records.is_empty() {
            continue;
        }
        writeln!(out)?;
        writeln!(out, "{severity} severity ({}):", records.len())?;
        for r in records.iter().take(opts.preview) {
            writeln!(out, "  {}:{}  Arc<Mutex<{}>>", r.file.display(), r.line, r.inner_type)?;
            writeln!(out, "    {}", r.line_content)?;
            for issue in &r.issues {
                writeln!(out, "    - {issue}")?;
            }
            for rec in &r.recommendations {
                writeln!(out, "    > {rec}")?;
            }
        }
        write_more(out, records.len(), opts.preview)?;
    }

    writeln!(out)?;
    write_breakdown(out, "By inner type", &report.by_type)
}

pub fn write_trait_report(out: &mut impl Write, report: &TraitAuditReport, opts: &ReportOptions) -> io::Result<()> {
    let s = &report.summary;
    heading(out, "TRAIT AUDIT")?;
    writeln!(out, "Total traits: {}", s.total)?;
    writeln!(out, "  Production: {}", s.production)?;
    writeln!(out, "  Test: {}", s.test)?;
    writeln!(out, "Single-method traits: {}", s.single_member)?;
    writeln!(out, "Distinct names: {}", s.unique_names)?;
    writeln!(out)?;

    writeln!(out, "Production traits by category:")?;
    for (category, count) in &s.by_category {
        writeln!(out, "  {category}: {count}")?;
    }
    writeln!(out)?;
    write_top_files(out, &report.top_files, "traits")?;

    for category in Category::ALL {
        let records: Vec<_> = report.with_category(category).collect();
        if records.is_empty() {
            continue;
        }
        writeln!(out)?;
        writeln!(out, "{category} ({}):", records.len())?;
        for r in records.iter().take(opts.preview) {
            writeln!(
                out,
                "  {}:{}  {} ({} members)",
                r.file.display(),
                r.line,
                r.name,
                r.member_count
            )?;
            for reason in &r.keep_reasons {
                writeln!(out, "    + {reason}")?;
            }
            for reason in &r.remove_reasons {
                writeln!(out, "    - {reason}")?;
            }
        }
        write_more(out, records.len(), opts.preview)?;
    }

    writeln!(out)?;
    write_breakdown(out, "By name", &report.by_name)
}

#[cfg(feature = "survey")]
pub fn write_survey(out: &mut impl Write, report: &crate::survey::SurveyReport) -> io::Result<()> {
    heading(out, "CODEBASE SURVEY")?;
    let o = &report.overview;
    writeln!(
        out,
        "Files: {} ({} production, {} test)",
        o.total_files, o.production_files, o.test_files
    )?;

    writeln!(out)?;
    writeln!(out, "Marker comments: {}", report.markers.total)?;
    for (marker, count) in &report.markers.by_marker {
        writeln!(out, "  {marker}: {count}")?;
    }

    writeln!(out)?;
    writeln!(out, "Clone calls: {}", report.clone_usage.total)?;
    for h in &report.clone_usage.hot_spots {
        writeln!(out, "  {}: {}", h.file.display(), h.count)?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Box<dyn>: {} ({} in Result error positions)",
        report.box_usage.box_dyn, report.box_usage.box_dyn_error
    )?;

    writeln!(out)?;
    writeln!(out, "String allocations: {}", report.string_allocations.total)?;
    for (pattern, count) in &report.string_allocations.by_pattern {
        writeln!(out, "  {pattern}: {count}")?;
    }
    for h in &report.string_allocations.hot_spots {
        writeln!(out, "  hot spot {}: {}", h.file.display(), h.count)?;
    }

    writeln!(out)?;
    let m = &report.must_use;
    writeln!(
        out,
        "#[must_use] coverage: {}/{} Result functions ({:.1}%)",
        m.must_use_count, m.result_functions, m.coverage_percent
    )?;
    writeln!(out, "Files without #[must_use]: {}", m.missing.len())?;

    writeln!(out)?;
    writeln!(
        out,
        "Async: {} async fns, {} .await calls",
        report.async_usage.async_functions, report.async_usage.await_calls
    )?;

    writeln!(out)?;
    let api = &report.api_surface;
    writeln!(out, "API surface:")?;
    writeln!(out, "  pub fn: {}", api.pub_fn)?;
    writeln!(out, "  pub(crate) fn: {}", api.pub_crate_fn)?;
    writeln!(out, "  private fn: {}", api.private_fn)?;
    writeln!(out, "  pub struct: {}", api.pub_struct)?;
    writeln!(out, "  pub enum: {}", api.pub_enum)?;
    writeln!(out, "  pub trait: {}", api.pub_trait)
}

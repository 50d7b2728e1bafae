//! Builder pattern API for auditmod.
//!
//! Provides a fluent interface for configuring and running the audit passes:
//!
//! ```rust,ignore
//! use auditmod_core::prelude::*;
//!
//! let report = Audit::new("/path/to/crate")
//!     .context_lines(2)
//!     .exclude_dirs(["vendor"])
//!     .run()?;
//!
//! if let Some(traits) = &report.traits {
//!     println!("Remove candidates: {}", traits.remove_candidates.len());
//! }
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::info;

use crate::aggregate::{
    build_lock_report, build_trait_report, AuditReport, CorpusSummary, LockAuditReport,
    LockFinding, TraitAuditReport, TraitFinding,
};
use crate::classify::{assess_occurrence, classify_declaration, Thresholds};
use crate::config::AuditConfig;
use crate::extract::{extract_occurrences, extract_trait_declarations, LinePattern, DEFAULT_CONTEXT_LINES};
use crate::profile::profile_all;
use crate::report::ReportOptions;
use crate::scan::{load_corpus, Corpus};

/// Which passes a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passes {
    pub locks: bool,
    pub traits: bool,
    pub survey: bool,
}

impl Passes {
    pub fn all() -> Self {
        Self {
            locks: true,
            traits: true,
            survey: true,
        }
    }

    /// True when no pass is selected.
    pub fn is_empty(&self) -> bool {
        !(self.locks || self.traits || self.survey)
    }
}

/// Builder for configuring an audit.
///
/// # Example
///
/// ```rust,ignore
/// let locks = Audit::new("/my/crate")
///     .include_tests(false)
///     .locks()?;
/// ```
#[derive(Debug, Clone)]
pub struct Audit {
    /// Root of the corpus
    root: PathBuf,

    /// Classifier thresholds
    thresholds: Thresholds,

    /// Ranking and preview limits
    options: ReportOptions,

    /// Context radius for lock occurrences
    context_lines: usize,

    /// Whether test units take part in the run
    include_tests: bool,

    /// Extra excluded directory names
    excluded_dirs: Vec<String>,
}

impl Audit {
    /// Create a new audit builder for the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            thresholds: Thresholds::default(),
            options: ReportOptions::default(),
            context_lines: DEFAULT_CONTEXT_LINES,
            include_tests: true,
            excluded_dirs: Vec::new(),
        }
    }

    /// Apply every value set in a loaded `auditmod.toml`.
    pub fn with_config(mut self, config: &AuditConfig) -> Self {
        self.thresholds = config.thresholds();
        self.options = config.report_options();
        if let Some(n) = config.context_lines() {
            self.context_lines = n;
        }
        self.exclude_dirs(config.excluded_dirs())
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn report_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of files kept in top-files rankings.
    pub fn top_files(mut self, n: usize) -> Self {
        self.options.top_files = n;
        self
    }

    /// Lines captured on each side of a lock occurrence.
    pub fn context_lines(mut self, n: usize) -> Self {
        self.context_lines = n;
        self
    }

    /// Keep or drop test units. Dropped units are not profiled either.
    pub fn include_tests(mut self, enabled: bool) -> Self {
        self.include_tests = enabled;
        self
    }

    /// Add directories to exclude from scanning.
    pub fn exclude_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Load the corpus and set up a run.
    pub fn prepare(&self) -> Result<AuditRun> {
        let excludes: Vec<&str> = self.excluded_dirs.iter().map(String::as_str).collect();

        let mut corpus = load_corpus(&self.root, &excludes)
            .with_context(|| format!("Failed to load corpus at {}", self.root.display()))?;
        if !self.include_tests {
            corpus.units.retain(|u| !u.kind.is_test());
        }

        Ok(AuditRun {
            corpus,
            thresholds: self.thresholds,
            options: self.options,
            context_lines: self.context_lines,
        })
    }

    /// Run only the `Arc<Mutex<T>>` pass.
    pub fn locks(&self) -> Result<LockAuditReport> {
        Ok(self.prepare()?.lock_report())
    }

    /// Run only the trait pass.
    pub fn traits(&self) -> Result<TraitAuditReport> {
        Ok(self.prepare()?.trait_report())
    }

    /// Run only the survey.
    #[cfg(feature = "survey")]
    pub fn survey(&self) -> Result<crate::survey::SurveyReport> {
        Ok(self.prepare()?.survey_report())
    }

    /// Run every pass.
    pub fn run(&self) -> Result<AuditReport> {
        self.run_passes(Passes::all())
    }

    /// Run the selected passes over one corpus load.
    pub fn run_passes(&self, passes: Passes) -> Result<AuditReport> {
        Ok(self.prepare()?.report(passes))
    }
}

/// State for one run: the loaded corpus and the settings it is audited with.
///
/// Nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct AuditRun {
    corpus: Corpus,
    thresholds: Thresholds,
    options: ReportOptions,
    context_lines: usize,
}

impl AuditRun {
    pub fn new(corpus: Corpus, thresholds: Thresholds, options: ReportOptions, context_lines: usize) -> Self {
        Self {
            corpus,
            thresholds,
            options,
            context_lines,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Every `Arc<Mutex<T>>` occurrence with its assessment, in corpus order.
    pub fn lock_findings(&self) -> Vec<LockFinding> {
        let pattern = LinePattern::arc_mutex();
        let findings: Vec<LockFinding> = self
            .corpus
            .units
            .par_iter()
            .flat_map_iter(|unit| {
                let occurrences = extract_occurrences(unit, pattern, self.context_lines);
                // Lowered once per unit, shared by every occurrence in it
                let lower = if occurrences.is_empty() {
                    String::new()
                } else {
                    unit.text.to_lowercase()
                };
                occurrences.into_iter().map(move |occurrence| LockFinding {
                    assessment: assess_occurrence(
                        &occurrence,
                        &unit.text,
                        &lower,
                        &self.thresholds,
                    ),
                    occurrence,
                })
            })
            .collect();

        info!(occurrences = findings.len(), "lock pass complete");
        findings
    }

    /// Every trait declaration, profiled and classified, in corpus order.
    pub fn trait_findings(&self) -> Vec<TraitFinding> {
        let units = &self.corpus.units;
        let declarations: Vec<_> = units
            .par_iter()
            .flat_map_iter(extract_trait_declarations)
            .collect();

        let profiles = profile_all(declarations.iter().map(|d| d.name.as_str()), units);

        let findings: Vec<TraitFinding> = declarations
            .into_iter()
            .map(|declaration| {
                let usage = profiles.get(&declaration.name).cloned().unwrap_or_default();
                let classification = classify_declaration(&declaration, &usage, &self.thresholds);
                TraitFinding {
                    declaration,
                    usage,
                    classification,
                }
            })
            .collect();

        info!(
            declarations = findings.len(),
            names = profiles.len(),
            "trait pass complete"
        );
        findings
    }

    pub fn lock_report(&self) -> LockAuditReport {
        build_lock_report(&self.lock_findings(), self.options.top_files, self.options.top_groups)
    }

    pub fn trait_report(&self) -> TraitAuditReport {
        build_trait_report(&self.trait_findings(), self.options.top_files, self.options.top_groups)
    }

    #[cfg(feature = "survey")]
    pub fn survey_report(&self) -> crate::survey::SurveyReport {
        crate::survey::survey(&self.corpus.units)
    }

    pub fn corpus_summary(&self) -> CorpusSummary {
        CorpusSummary {
            root: self.corpus.root.clone(),
            units: self.corpus.units.len(),
            test_units: self.corpus.test_count(),
            production_units: self.corpus.production_count(),
            skipped: self.corpus.skipped.clone(),
        }
    }

    /// Assemble the selected sections into one report.
    pub fn report(&self, passes: Passes) -> AuditReport {
        AuditReport {
            generated_at: Utc::now(),
            corpus: self.corpus_summary(),
            locks: passes.locks.then(|| self.lock_report()),
            traits: passes.traits.then(|| self.trait_report()),
            #[cfg(feature = "survey")]
            survey: passes.survey.then(|| self.survey_report()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::scan::SourceUnit;
    use std::fs;

    fn create_test_corpus(tag: &str) -> PathBuf {
        // Use unique dir name to avoid conflicts with concurrent tests
        let id = std::process::id();
        let dir = std::env::temp_dir().join(format!("auditmod_builder_{tag}_{id}"));

        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(dir.join("src")).expect("Failed to create test directory");
        fs::create_dir_all(dir.join("tests")).expect("Failed to create tests directory");
        fs::create_dir_all(dir.join("vendor")).expect("Failed to create vendor directory");

        fs::write(
            dir.join("src/lib.rs"),
            "pub trait Lonely {\n    fn alone(&self);\n}\n\nstruct S { n: Arc<Mutex<u64>> }\n",
        )
        .expect("Failed to write lib.rs");
        fs::write(
            dir.join("tests/it.rs"),
            "trait Fixture { fn a(&self); fn b(&self); }\nlet m: Arc<Mutex<Vec<u8>>> = x;\n",
        )
        .expect("Failed to write it.rs");
        fs::write(
            dir.join("vendor/dep.rs"),
            "trait Vendored { fn v(&self); }\n",
        )
        .expect("Failed to write dep.rs");

        dir
    }

    #[test]
    fn test_builder_run() {
        let dir = create_test_corpus("run");

        let report = Audit::new(&dir).exclude_dirs(["vendor"]).run().unwrap();
        assert_eq!(report.corpus.units, 2);
        assert_eq!(report.corpus.test_units, 1);

        let locks = report.locks.unwrap();
        assert_eq!(locks.summary.total, 2);
        assert_eq!(locks.summary.production, 1);

        let traits = report.traits.unwrap();
        assert_eq!(traits.summary.total, 2);
        assert_eq!(traits.declarations.len(), 1);
        assert_eq!(traits.declarations[0].name, "Lonely");
        assert_eq!(traits.declarations[0].category, Category::DefinitelyRemove);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builder_without_tests() {
        let dir = create_test_corpus("notests");

        let locks = Audit::new(&dir)
            .exclude_dirs(["vendor"])
            .include_tests(false)
            .locks()
            .unwrap();
        assert_eq!(locks.summary.total, 1);
        assert_eq!(locks.summary.test, 0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_selected_passes() {
        let dir = create_test_corpus("passes");

        let report = Audit::new(&dir)
            .run_passes(Passes {
                locks: false,
                traits: true,
                survey: false,
            })
            .unwrap();
        assert!(report.locks.is_none());
        // vendor is not excluded here
        assert_eq!(report.traits.unwrap().summary.production, 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = std::env::temp_dir().join(format!("auditmod_builder_missing_{}", std::process::id()));
        assert!(Audit::new(&dir).run().is_err());
    }

    #[test]
    fn test_run_from_units() {
        let corpus = Corpus::from_units(
            "mem",
            vec![
                SourceUnit::new("src/b.rs", "impl Shape for Square {}\nimpl Shape for Circle {}\n"),
                SourceUnit::new("src/a.rs", "pub trait Shape {\n    fn area(&self) -> f64;\n    fn name(&self) -> &str;\n}\n"),
            ],
        );
        let run = AuditRun::new(corpus, Thresholds::default(), ReportOptions::default(), 3);

        let findings = run.trait_findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].usage.implementation_count, 2);
        assert_eq!(findings[0].classification.category, Category::KeepAsIs);
        assert_eq!(run.corpus_summary().production_units, 2);
    }

    #[test]
    fn test_passes() {
        assert!(!Passes::all().is_empty());
        assert!(Passes {
            locks: false,
            traits: false,
            survey: false
        }
        .is_empty());
    }
}

//! auditmod-core: heuristic source-pattern auditing for Rust codebases
//!
//! This library scans a tree of `.rs` files as plain text and reports two
//! families of findings:
//!
//! - **Lock audit**: every `Arc<Mutex<T>>` occurrence, assessed by a list of
//!   independent checks (atomic candidates, read-heavy access, missing
//!   concurrency, clone hot spots) into `HIGH` / `MEDIUM` / `LOW` severity
//! - **Trait audit**: every trait declaration, profiled for implementations,
//!   `dyn` references and bound uses, then classified as `DEFINITELY_REMOVE`,
//!   `MAYBE_REMOVE` or `KEEP_AS_IS` with ordered reasons
//! - **Survey** (feature `survey`): corpus-wide lexical statistics
//!
//! Everything is regex and brace counting. There is no parser and no name
//! resolution, so results are advisory.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use auditmod_core::prelude::*;
//!
//! let report = Audit::new("/path/to/crate").run()?;
//! print_plain(&report, &ReportOptions::default());
//! ```
//!
//! # Module Organization
//!
//! - [`scan`]: Parallel file discovery and corpus loading
//! - [`extract`]: Line occurrences and trait declarations
//! - [`profile`]: Cross-corpus usage profiles per trait name
//! - [`classify`]: Declaration rules and occurrence checks
//! - [`aggregate`]: Ranking and typed reports
//! - [`report`]: Plain-text and JSON rendering
//! - [`builder`]: Fluent builder API and the per-run accumulator
//! - [`error`]: Typed error handling
//!
//! # Cargo Features
//!
//! - `survey` (default): Enable the corpus survey pass

// Core modules (always available)
pub mod aggregate;
pub mod builder;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod prelude;
pub mod profile;
pub mod report;
pub mod scan;

// Feature-gated modules
#[cfg(feature = "survey")]
pub mod survey;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{AuditError, AuditResult, IoResultExt};

// Builder API
pub use builder::{Audit, AuditRun, Passes};

// Configuration
pub use config::{load_config, AuditConfig, OutputConfig, ThresholdsConfig, CONFIG_FILE};

// Corpus
pub use scan::{
    gather_rs_files, gather_rs_files_with_excludes, load_corpus, read_unit, unit_kind,
    Corpus, SkippedUnit, SourceUnit, UnitKind, EXCLUDED_DIRS,
};

// Extraction
pub use extract::{
    extract_occurrences, extract_trait_declarations, DeclarationUnit, LinePattern, Location,
    Occurrence,
};

// Profiling
pub use profile::{profile_all, profile_usage, UsageProfile};

// Classification
pub use classify::{
    assess_occurrence, classify_declaration, Category, ClassificationResult, Severity,
    SeverityAssessment, Thresholds,
};

// Aggregation
pub use aggregate::{
    build_lock_report, build_trait_report, rank_by, AuditReport, CorpusSummary, FileCount,
    GroupCount, LockAuditReport, LockFinding, LockRecord, TraitAuditReport, TraitFinding,
    TraitRecord,
};

// Logging
pub use logging::{init_structured_logging, log_info, log_warn};

// Reporting
pub use report::{print_json, print_plain, save_report, to_json, write_plain, ReportOptions};

#[cfg(feature = "survey")]
pub use survey::{survey, SurveyReport};

#[cfg(test)]
mod tests;

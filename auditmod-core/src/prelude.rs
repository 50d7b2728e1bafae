//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use auditmod_core::prelude::*;
//! ```

// Running an audit
pub use crate::builder::{Audit, AuditRun, Passes};
pub use crate::config::{load_config, AuditConfig};
pub use crate::error::{AuditError, AuditResult};

// Results
pub use crate::aggregate::{AuditReport, LockAuditReport, TraitAuditReport};
pub use crate::classify::{Category, Severity, Thresholds};

// Output
pub use crate::report::{print_json, print_plain, save_report, ReportOptions};

#[cfg(feature = "survey")]
pub use crate::survey::SurveyReport;

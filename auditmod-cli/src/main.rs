//! auditmod CLI - heuristic lock and trait auditor for Rust projects.
//!
//! Features:
//! - `Arc<Mutex<T>>` audit with severity, issues and recommendations
//! - Trait audit with keep/remove classification and reasons
//! - Corpus survey (markers, clones, allocations, API surface)
//! - Rayon-powered parallel scanning
//! - Plain-text or JSON output, optional JSON report file

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use auditmod_core::{
    init_structured_logging, load_config, log_info, log_warn, print_json, print_plain, save_report,
    Audit, Passes,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Heuristic lock and trait auditor for Rust")]
pub struct Cli {
    /// Path to the root of the Rust project
    #[arg(default_value = ".")]
    path: String,

    /// Run the Arc<Mutex<T>> audit
    #[arg(long)]
    locks: bool,

    /// Run the trait audit
    #[arg(long)]
    traits: bool,

    /// Run the corpus survey
    #[arg(long)]
    survey: bool,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to a file (relative path)
    #[arg(long, value_name = "FILE")]
    output: Option<String>,

    /// Number of files in top-files rankings
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Findings shown per severity/category group
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Lines of context captured around each lock occurrence
    #[arg(long, value_name = "N")]
    context: Option<usize>,

    /// Extra directory names to exclude
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,
}

impl Cli {
    /// Selected passes; none selected means all of them.
    fn passes(&self) -> Passes {
        let selected = Passes {
            locks: self.locks,
            traits: self.traits,
            survey: self.survey,
        };
        if selected.is_empty() {
            Passes::all()
        } else {
            selected
        }
    }
}

/// Validates an output file path.
///
/// Returns the validated PathBuf or an error.
fn validate_output_path(path: &str) -> Result<PathBuf> {
    if path.contains('\0') {
        return Err(anyhow!("Output path contains null bytes"));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(anyhow!(
            "Output path must be relative, not absolute: {}",
            path
        ));
    }

    for component in p.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(anyhow!(
                "Path traversal (..) not allowed in output paths: {}",
                path
            ));
        }
    }

    Ok(p)
}

fn main() -> Result<()> {
    // Global panic guard
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] auditmod internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
    }));

    // Initialize structured logging (JSON to stderr, respects RUST_LOG)
    init_structured_logging();

    let cli = Cli::parse();
    let root = Path::new(&cli.path);

    // Validate before the run so a bad path fails fast
    let output = cli
        .output
        .as_deref()
        .map(validate_output_path)
        .transpose()?;

    // 1. Config file, then CLI overrides
    let config = load_config(root)
        .with_context(|| format!("Failed to load config from: {}", cli.path))?
        .unwrap_or_default();

    let mut options = config.report_options();
    if let Some(n) = cli.top {
        options.top_files = n;
    }
    if let Some(n) = cli.preview {
        options.preview = n;
    }

    let mut audit = Audit::new(root)
        .with_config(&config)
        .report_options(options)
        .exclude_dirs(cli.exclude.iter().cloned());
    if let Some(n) = cli.context {
        audit = audit.context_lines(n);
    }

    // 2. Run
    let passes = cli.passes();
    log_info(&format!(
        "passes: locks={} traits={} survey={}",
        passes.locks, passes.traits, passes.survey
    ));
    let report = audit
        .run_passes(passes)
        .with_context(|| format!("Audit failed for: {}", cli.path))?;
    if report.corpus.units == 0 {
        log_warn(&format!("no readable .rs files under {}", cli.path));
    }

    // 3. Output
    if cli.json || config.wants_json() {
        print_json(&report);
    } else {
        print_plain(&report, &options);
    }

    if let Some(path) = output {
        save_report(&path, &report)
            .with_context(|| format!("Failed to write report to: {}", path.display()))?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

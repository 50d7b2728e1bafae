//! End-to-end test suite for auditmod-core.

use crate::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn write_file(file: &Path, content: impl AsRef<[u8]>) {
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, content).unwrap();
}

fn setup_temp_project() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir()
        .join("auditmod_tests")
        .join(format!("{}_{}", std::process::id(), id));

    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(dir.join("src")).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    fs::remove_dir_all(dir).ok();
}

// Core Test 1: two units, one removable trait and one well-used trait
#[test]
fn test_end_to_end_two_units() {
    let root = setup_temp_project();
    write_file(
        &root.join("src/lonely.rs"),
        "pub trait Lonely {\n    fn only(&self);\n}\n",
    );
    write_file(
        &root.join("src/shapes.rs"),
        r#"
pub trait Shape {
    fn area(&self) -> f64;
    fn perimeter(&self) -> f64;
    fn name(&self) -> &str;
}

impl Shape for Circle {
    fn area(&self) -> f64 { 0.0 }
    fn perimeter(&self) -> f64 { 0.0 }
    fn name(&self) -> &str { "circle" }
}

impl Shape for Square {
    fn area(&self) -> f64 { 0.0 }
    fn perimeter(&self) -> f64 { 0.0 }
    fn name(&self) -> &str { "square" }
}

pub fn draw(shape: &dyn Shape) {}
"#,
    );

    let report = Audit::new(&root).traits().unwrap();

    assert_eq!(report.summary.production, 2);
    assert_eq!(report.summary.by_category[&Category::DefinitelyRemove], 1);
    assert_eq!(report.summary.by_category[&Category::MaybeRemove], 0);
    assert_eq!(report.summary.by_category[&Category::KeepAsIs], 1);

    let candidates: Vec<&str> = report
        .remove_candidates
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(candidates, vec!["Lonely"]);

    let shape = report.declarations.iter().find(|d| d.name == "Shape").unwrap();
    assert_eq!(shape.member_count, 3);
    assert_eq!(shape.implementation_count, 2);
    assert_eq!(shape.dynamic_use_count, 1);
    assert_eq!(
        shape.keep_reasons,
        vec!["used dynamically (1 dyn references)", "2 implementations"]
    );
    assert!(shape.remove_reasons.is_empty());

    cleanup(&root);
}

// Core Test 2: an undecodable unit is skipped, the rest is still audited
#[test]
fn test_corpus_robustness() {
    let root = setup_temp_project();
    write_file(&root.join("src/good.rs"), "static S: Arc<Mutex<u32>> = x;\n");
    write_file(&root.join("src/bad.rs"), [0xff_u8, 0xfe, 0x00, 0x80]);

    let report = Audit::new(&root).run().unwrap();

    assert_eq!(report.corpus.units, 1);
    assert_eq!(report.corpus.skipped.len(), 1);
    assert_eq!(report.corpus.skipped[0].path, PathBuf::from("src/bad.rs"));

    let locks = report.locks.as_ref().unwrap();
    assert_eq!(locks.summary.total, 1);
    assert!(locks
        .production_usages
        .iter()
        .all(|r| r.file != Path::new("src/bad.rs")));

    // Skipped units show up in both renderings
    let json: serde_json::Value = serde_json::from_str(&to_json(&report)).unwrap();
    assert_eq!(json["corpus"]["skipped"][0]["path"], "src/bad.rs");

    let mut buf = Vec::new();
    write_plain(&mut buf, &report, &ReportOptions::default()).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("Skipped units (1):"));

    cleanup(&root);
}

// Core Test 2b: an unreadable directory is skipped, the rest is still audited
#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let root = setup_temp_project();
    write_file(&root.join("src/a.rs"), "struct A { n: Arc<Mutex<u64>> }\n");
    write_file(&root.join("locked/b.rs"), "struct B { n: Arc<Mutex<u64>> }\n");
    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through mode 000; nothing to check then
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        cleanup(&root);
        return;
    }

    let result = Audit::new(&root).run();
    let strict = gather_rs_files(&root);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let report = result.unwrap();

    assert_eq!(report.corpus.units, 1);
    assert_eq!(report.corpus.skipped.len(), 1);
    assert_eq!(report.corpus.skipped[0].path, PathBuf::from("locked"));
    assert!(!report.corpus.skipped[0].reason.is_empty());
    assert_eq!(report.locks.unwrap().summary.total, 1);

    // The strict gather still reports the walk error
    assert!(strict.is_err());

    cleanup(&root);
}

// Core Test 3: test units are counted but not listed
#[test]
fn test_test_and_production_tagging() {
    let root = setup_temp_project();
    write_file(&root.join("src/state.rs"), "use std::thread;\nlet a: Arc<Mutex<Queue>> = q;\n");
    write_file(
        &root.join("tests/integration.rs"),
        "let a: Arc<Mutex<Queue>> = q;\nlet b: Arc<Mutex<Queue>> = q;\nlet c: Arc<Mutex<Queue>> = q;\n",
    );
    write_file(&root.join("src/test_helpers.rs"), "let h: Arc<Mutex<Queue>> = q;\n");

    let locks = Audit::new(&root).locks().unwrap();

    assert_eq!(locks.summary.total, 5);
    assert_eq!(locks.summary.test, 4);
    assert_eq!(locks.summary.production, 1);
    assert_eq!(locks.production_usages.len(), 1);
    assert_eq!(locks.production_usages[0].file, PathBuf::from("src/state.rs"));

    // Top files rank across both kinds, with the tag
    assert_eq!(locks.top_files[0].file, PathBuf::from("tests/integration.rs"));
    assert_eq!(locks.top_files[0].count, 3);
    assert!(locks.top_files[0].is_test);
    assert!(locks
        .top_files
        .iter()
        .any(|f| f.file == Path::new("src/state.rs") && !f.is_test));

    cleanup(&root);
}

// Core Test 4: auditmod.toml overrides thresholds and excludes
#[test]
fn test_config_overrides() {
    let root = setup_temp_project();
    write_file(
        &root.join(CONFIG_FILE),
        r#"
exclude = ["generated"]

[thresholds]
high_min_issues = 2

[output]
top_files = 1
"#,
    );
    write_file(&root.join("src/a.rs"), "struct A { n: Arc<Mutex<u64>> }\n");
    write_file(&root.join("src/b.rs"), "struct B { n: Arc<Mutex<u64>> }\n");
    write_file(&root.join("generated/c.rs"), "struct C { n: Arc<Mutex<u64>> }\n");

    let config = load_config(&root).unwrap().unwrap();
    let locks = Audit::new(&root).with_config(&config).locks().unwrap();

    assert_eq!(locks.summary.total, 2);
    // primitive + no concurrency = 2 issues, HIGH under the override
    assert_eq!(locks.summary.by_severity[&Severity::High], 2);
    assert_eq!(locks.top_files.len(), 1);

    let defaults = Audit::new(&root).exclude_dirs(["generated"]).locks().unwrap();
    assert_eq!(defaults.summary.by_severity[&Severity::Medium], 2);
    assert_eq!(defaults.summary.by_severity[&Severity::High], 0);

    cleanup(&root);
}

// Core Test 5: declarations nested inside other blocks
#[test]
fn test_nested_declarations_end_to_end() {
    let root = setup_temp_project();
    write_file(
        &root.join("src/nested.rs"),
        r#"
mod outer {
    mod inner {
        pub trait Deep {
            fn go(&self) {
                if true { loop { break; } }
            }
            fn stop(&self);
        }
    }
}
"#,
    );

    let report = Audit::new(&root).traits().unwrap();
    assert_eq!(report.declarations.len(), 1);
    assert_eq!(report.declarations[0].name, "Deep");
    assert_eq!(report.declarations[0].members, vec!["go", "stop"]);
    assert_eq!(report.declarations[0].line, 4);

    cleanup(&root);
}

// Core Test 6: two runs over the same tree give the same report
#[test]
fn test_runs_are_deterministic() {
    let root = setup_temp_project();
    for i in 0..6 {
        write_file(
            &root.join(format!("src/m{i}.rs")),
            format!(
                "pub trait T{i} {{ fn a(&self); }}\nimpl T{i} for X {{}}\nlet v: Arc<Mutex<Vec<u{}>>> = x;\n",
                8 << (i % 3)
            ),
        );
    }

    let strip = |mut v: serde_json::Value| {
        v.as_object_mut().unwrap().remove("generated_at");
        v
    };
    let first = strip(serde_json::to_value(Audit::new(&root).run().unwrap()).unwrap());
    let second = strip(serde_json::to_value(Audit::new(&root).run().unwrap()).unwrap());
    assert_eq!(first, second);

    cleanup(&root);
}

#[test]
fn test_empty_corpus() {
    let root = setup_temp_project();

    let report = Audit::new(&root).run().unwrap();
    assert_eq!(report.corpus.units, 0);
    assert_eq!(report.locks.unwrap().summary.total, 0);
    let traits = report.traits.unwrap();
    assert!(traits.declarations.is_empty());
    assert!(traits.by_name.is_empty());

    cleanup(&root);
}

#[cfg(feature = "survey")]
#[test]
fn test_survey_pass() {
    let root = setup_temp_project();
    write_file(
        &root.join("src/lib.rs"),
        "// HACK: temporary\npub fn f() -> Result<(), E> { Ok(()) }\n",
    );

    let survey = Audit::new(&root).survey().unwrap();
    assert_eq!(survey.overview.total_files, 1);
    assert_eq!(survey.markers.by_marker["HACK"], 1);
    assert_eq!(survey.must_use.missing.len(), 1);
    assert_eq!(survey.api_surface.pub_fn, 1);

    cleanup(&root);
}

//! Corpus-wide usage profiling for a named construct.
//!
//! Three independent textual patterns are matched against every unit:
//!
//! | kind           | shape                               |
//! |----------------|-------------------------------------|
//! | implementation | `impl[<..>] [path::]Name[<..>] for` |
//! | dynamic use    | `dyn [path::]Name`                  |
//! | bound use      | `: [path::]Name` / `+ [path::]Name` |
//!
//! Every match counts; repeated matches in one unit are not deduplicated.

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::scan::SourceUnit;

/// How a construct name is referenced across the corpus.
///
/// Each count is the sum over units of per-unit match counts; the unit sets
/// hold the units with at least one match of that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageProfile {
    pub implementation_count: usize,
    pub dynamic_use_count: usize,
    pub bound_use_count: usize,
    pub implementation_units: BTreeSet<PathBuf>,
    pub dynamic_use_units: BTreeSet<PathBuf>,
    pub bound_use_units: BTreeSet<PathBuf>,
}

impl UsageProfile {
    /// Fold another partial profile (e.g. from another shard) into this one.
    pub fn merge(&mut self, other: UsageProfile) {
        self.implementation_count += other.implementation_count;
        self.dynamic_use_count += other.dynamic_use_count;
        self.bound_use_count += other.bound_use_count;
        self.implementation_units.extend(other.implementation_units);
        self.dynamic_use_units.extend(other.dynamic_use_units);
        self.bound_use_units.extend(other.bound_use_units);
    }
}

/// Compiled reference patterns for one name.
struct UsagePatterns {
    implementation: Regex,
    dynamic: Regex,
    bound: Regex,
}

impl UsagePatterns {
    fn for_name(name: &str) -> Option<Self> {
        let escaped = regex::escape(name);
        let path_prefix = r"(?:[A-Za-z_][A-Za-z0-9_]*::)*";
        Some(Self {
            implementation: Regex::new(&format!(
                r"\bimpl\b(?:[ \t]*<[^>\n]*>)?[ \t]+{path_prefix}{escaped}\b(?:[ \t]*<[^>\n]*>)?[ \t]+for\b"
            ))
            .ok()?,
            dynamic: Regex::new(&format!(r"\bdyn[ \t]+{path_prefix}{escaped}\b")).ok()?,
            // `(?:^|[^:])` keeps `path::Name` from counting as a bound
            bound: Regex::new(&format!(r"(?:^|[^:])[:+][ \t]*{path_prefix}{escaped}\b")).ok()?,
        })
    }

    fn scan(&self, unit: &SourceUnit) -> UsageProfile {
        let mut profile = UsageProfile::default();

        let implementations = self.implementation.find_iter(&unit.text).count();
        if implementations > 0 {
            profile.implementation_count = implementations;
            profile.implementation_units.insert(unit.path.clone());
        }

        let dynamic = self.dynamic.find_iter(&unit.text).count();
        if dynamic > 0 {
            profile.dynamic_use_count = dynamic;
            profile.dynamic_use_units.insert(unit.path.clone());
        }

        let bounds = self.bound.find_iter(&unit.text).count();
        if bounds > 0 {
            profile.bound_use_count = bounds;
            profile.bound_use_units.insert(unit.path.clone());
        }

        profile
    }
}

/// Profile one name across all units.
///
/// Returns an empty profile if the name cannot form a valid pattern.
pub fn profile_usage(name: &str, units: &[SourceUnit]) -> UsageProfile {
    let Some(patterns) = UsagePatterns::for_name(name) else {
        return UsageProfile::default();
    };

    let mut profile = UsageProfile::default();
    for unit in units {
        profile.merge(patterns.scan(unit));
    }
    profile
}

/// Profile many names, sharding names across Rayon workers.
///
/// Duplicate names are profiled once. The result is ordered by name.
pub fn profile_all<'a, I>(names: I, units: &[SourceUnit]) -> BTreeMap<String, UsageProfile>
where
    I: IntoIterator<Item = &'a str>,
{
    let unique: BTreeSet<&str> = names.into_iter().collect();

    unique
        .into_par_iter()
        .map(|name| (name.to_string(), profile_usage(name, units)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> Vec<SourceUnit> {
        vec![
            SourceUnit::new(
                "src/a.rs",
                r#"
pub trait Codec { fn encode(&self); }
impl Codec for Json { fn encode(&self) {} }
impl<T: Clone> Codec for Wrapper<T> { fn encode(&self) {} }
fn pick(c: &dyn Codec) {}
fn many(c: Vec<Box<dyn crate::codec::Codec>>) {}
"#,
            ),
            SourceUnit::new(
                "src/b.rs",
                r#"
impl codec::Codec for Yaml { fn encode(&self) {} }
fn run<C: Codec>(c: C) {}
fn run2<C>(c: C) where C: Send + Codec {}
use crate::Codec;
struct CodecHolder;
impl CodecHolder {}
"#,
            ),
        ]
    }

    #[test]
    fn test_counts_sum_over_units() {
        let p = profile_usage("Codec", &units());

        assert_eq!(p.implementation_count, 3);
        assert_eq!(p.dynamic_use_count, 2);
        assert_eq!(p.bound_use_count, 2);

        assert_eq!(p.implementation_units.len(), 2);
        assert_eq!(
            p.dynamic_use_units.iter().collect::<Vec<_>>(),
            vec![&PathBuf::from("src/a.rs")]
        );
        assert_eq!(
            p.bound_use_units.iter().collect::<Vec<_>>(),
            vec![&PathBuf::from("src/b.rs")]
        );
    }

    #[test]
    fn test_path_segments_are_not_bounds() {
        let u = vec![SourceUnit::new("src/x.rs", "use crate::Codec;\nlet x = a::Codec::new();")];
        let p = profile_usage("Codec", &u);
        assert_eq!(p.bound_use_count, 0);
    }

    #[test]
    fn test_word_boundaries() {
        let u = vec![SourceUnit::new(
            "src/x.rs",
            "impl CodecExt for A {}\nfn f(x: &dyn CodecExt) {}\nfn g<T: CodecExt>() {}",
        )];
        assert_eq!(profile_usage("Codec", &u), UsageProfile::default());
    }

    #[test]
    fn test_repeated_matches_all_count() {
        let u = vec![SourceUnit::new(
            "src/x.rs",
            "fn a(x: &dyn Sink) {}\nfn b(x: &dyn Sink) {}\nfn c(x: &dyn Sink) {}",
        )];
        let p = profile_usage("Sink", &u);
        assert_eq!(p.dynamic_use_count, 3);
        assert_eq!(p.dynamic_use_units.len(), 1);
    }

    #[test]
    fn test_profile_all_matches_single_name_profiling() {
        let corpus = units();
        let all = profile_all(["Codec", "Missing", "Codec"], &corpus);

        assert_eq!(all.len(), 2);
        assert_eq!(all["Codec"], profile_usage("Codec", &corpus));
        assert_eq!(all["Missing"], UsageProfile::default());
    }
}

//! Declaration rules.
//!
//! Each rule is a predicate plus a reason and a keep/remove verdict. Rules are
//! evaluated in slice order and each one that applies appends exactly one
//! reason, so adding a rule never changes the reasons produced by the others.

use serde::Serialize;

use super::{Category, Thresholds};
use crate::extract::DeclarationUnit;
use crate::profile::UsageProfile;

/// Which reason list a rule feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Keep,
    Remove,
}

/// Inputs available to a rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub declaration: &'a DeclarationUnit,
    pub usage: &'a UsageProfile,
    pub thresholds: &'a Thresholds,
}

/// One independent classification rule.
pub struct DeclarationRule {
    /// Stable identifier, used in tests and debug output
    pub id: &'static str,
    pub verdict: Verdict,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub reason: fn(&RuleInput<'_>) -> String,
}

impl DeclarationRule {
    pub fn evaluate(&self, input: &RuleInput<'_>) -> Option<(Verdict, String)> {
        (self.applies)(input).then(|| (self.verdict, (self.reason)(input)))
    }
}

/// The rule list, in evaluation order.
pub static DECLARATION_RULES: &[DeclarationRule] = &[
    DeclarationRule {
        id: "single_member",
        verdict: Verdict::Remove,
        applies: |i| i.declaration.member_count == 1,
        reason: |_| "single-member construct".to_string(),
    },
    DeclarationRule {
        id: "associated_types",
        verdict: Verdict::Keep,
        applies: |i| !i.declaration.associated_type_names.is_empty(),
        reason: |i| {
            let names: Vec<&str> = i
                .declaration
                .associated_type_names
                .iter()
                .map(String::as_str)
                .collect();
            format!("defines associated types: {}", names.join(", "))
        },
    },
    DeclarationRule {
        id: "parameterized",
        verdict: Verdict::Keep,
        applies: |i| i.declaration.is_parameterized,
        reason: |_| "uses generics/parameters".to_string(),
    },
    DeclarationRule {
        id: "dynamic_use",
        verdict: Verdict::Keep,
        applies: |i| i.usage.dynamic_use_count > 0,
        reason: |i| format!("used dynamically ({} dyn references)", i.usage.dynamic_use_count),
    },
    DeclarationRule {
        id: "multiple_implementations",
        verdict: Verdict::Keep,
        applies: |i| i.usage.implementation_count > 1,
        reason: |i| format!("{} implementations", i.usage.implementation_count),
    },
    DeclarationRule {
        id: "no_implementations",
        verdict: Verdict::Remove,
        applies: |i| i.usage.implementation_count == 0,
        reason: |_| "no implementations found".to_string(),
    },
    DeclarationRule {
        id: "single_implementation",
        verdict: Verdict::Remove,
        applies: |i| i.usage.implementation_count == 1,
        reason: |_| "only one implementation".to_string(),
    },
    DeclarationRule {
        id: "bound_use",
        verdict: Verdict::Keep,
        applies: |i| i.usage.bound_use_count > i.thresholds.bound_use_keep_above,
        reason: |i| format!("used as a bound {} times", i.usage.bound_use_count),
    },
];

/// Category plus the reasons that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub keep_reasons: Vec<String>,
    pub remove_reasons: Vec<String>,
}

/// Classify one declaration against its usage profile.
pub fn classify_declaration(
    declaration: &DeclarationUnit,
    usage: &UsageProfile,
    thresholds: &Thresholds,
) -> ClassificationResult {
    let input = RuleInput {
        declaration,
        usage,
        thresholds,
    };

    let mut keep_reasons = Vec::new();
    let mut remove_reasons = Vec::new();
    for (verdict, reason) in DECLARATION_RULES.iter().filter_map(|r| r.evaluate(&input)) {
        match verdict {
            Verdict::Keep => keep_reasons.push(reason),
            Verdict::Remove => remove_reasons.push(reason),
        }
    }

    ClassificationResult {
        category: thresholds.decide(keep_reasons.len(), remove_reasons.len()),
        keep_reasons,
        remove_reasons,
    }
}

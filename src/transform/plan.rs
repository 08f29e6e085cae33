//! Validation and optimization of an ordered transformer sequence.

use super::{DataKind, TransformerDependency, TransformerTraits};
use crate::exec::binary_available;

/// Problem classes a plan can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Conflict,
    IncompatibleTypes,
    Ordering,
    MissingResource,
    Performance,
    Redundancy,
}

/// One validation finding.
#[derive(Debug, Clone)]
pub struct PlanIssue {
    pub kind: IssueKind,
    pub message: String,
}

/// Outcome of validating a plan.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    /// False when any hard issue exists.
    pub valid: bool,
    /// Hard problems; the plan should not run as-is.
    pub issues: Vec<PlanIssue>,
    /// Soft problems; the plan runs but could be better.
    pub warnings: Vec<PlanIssue>,
}

/// A plan entry: transformer name plus its declared traits.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub name: String,
    pub traits: TransformerTraits,
}

impl PlanEntry {
    pub fn new<S: Into<String>>(name: S, traits: TransformerTraits) -> Self {
        Self {
            name: name.into(),
            traits,
        }
    }
}

/// Validates an ordered transformer sequence.
///
/// Hard issues: declared conflicts between any two entries, adjacent
/// type mismatches, unavailable binary dependencies. Soft warnings: heavy
/// work scheduled before cheap work, immediate idempotent repetition,
/// API-key requirements that cannot be checked here, and order-sensitive
/// entries that type-mismatch anywhere downstream (an ordering smell the
/// optimizer must not fix by moving them).
pub fn validate(entries: &[PlanEntry]) -> PlanReport {
    let mut report = PlanReport {
        valid: true,
        ..PlanReport::default()
    };

    for (i, a) in entries.iter().enumerate() {
        for b in entries.iter().skip(i + 1) {
            if a.traits.conflicts_with.iter().any(|c| c == &b.name)
                || b.traits.conflicts_with.iter().any(|c| c == &a.name)
            {
                report.issues.push(PlanIssue {
                    kind: IssueKind::Conflict,
                    message: format!("'{}' conflicts with '{}'", a.name, b.name),
                });
            }
        }
    }

    for pair in entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if !b.traits.input.accepts(a.traits.output) {
            let kind = if a.traits.order_sensitive || b.traits.order_sensitive {
                IssueKind::Ordering
            } else {
                IssueKind::IncompatibleTypes
            };
            report.issues.push(PlanIssue {
                kind,
                message: format!(
                    "'{}' produces {:?} but '{}' consumes {:?}",
                    a.name, a.traits.output, b.name, b.traits.input
                ),
            });
        }
        if a.name == b.name && a.traits.idempotent {
            report.warnings.push(PlanIssue {
                kind: IssueKind::Redundancy,
                message: format!("'{}' repeated back-to-back is redundant", a.name),
            });
        }
    }

    for entry in entries {
        for dependency in &entry.traits.dependencies {
            if let TransformerDependency::Binary(program) = dependency {
                if !binary_available(program) {
                    report.issues.push(PlanIssue {
                        kind: IssueKind::MissingResource,
                        message: format!("'{}' requires '{program}' on PATH", entry.name),
                    });
                }
            }
        }
        if entry.traits.requirements.api_key {
            report.warnings.push(PlanIssue {
                kind: IssueKind::MissingResource,
                message: format!("'{}' requires an API key at run time", entry.name),
            });
        }
    }

    if let Some(first_heavy) = entries.iter().position(|e| e.traits.heavy) {
        if entries.iter().skip(first_heavy + 1).any(|e| !e.traits.heavy) {
            report.warnings.push(PlanIssue {
                kind: IssueKind::Performance,
                message: "heavy transformers scheduled before cheap ones".to_string(),
            });
        }
    }

    report.valid = report.issues.is_empty();
    report
}

/// Reorders non-order-sensitive entries so heavy transformers run last.
///
/// Order-sensitive entries are anchored: they keep their exact positions,
/// and only the remaining slots are repacked (cheap entries first, heavy
/// entries after, each group keeping its relative order).
pub fn optimize(entries: Vec<PlanEntry>) -> Vec<PlanEntry> {
    let mut movable_slots = Vec::new();
    let mut movable = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if !entry.traits.order_sensitive {
            movable_slots.push(i);
            movable.push(entry.clone());
        }
    }

    let (cheap, heavy): (Vec<PlanEntry>, Vec<PlanEntry>) =
        movable.into_iter().partition(|e| !e.traits.heavy);

    let mut result: Vec<Option<PlanEntry>> = entries.into_iter().map(Some).collect();
    for (slot, entry) in movable_slots
        .into_iter()
        .zip(cheap.into_iter().chain(heavy))
    {
        result[slot] = Some(entry);
    }
    result.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, configure: impl FnOnce(&mut TransformerTraits)) -> PlanEntry {
        let mut traits = TransformerTraits {
            input: DataKind::Any,
            output: DataKind::Any,
            ..TransformerTraits::default()
        };
        configure(&mut traits);
        PlanEntry::new(name, traits)
    }

    #[test]
    fn clean_plan_is_valid() {
        let report = validate(&[entry("a", |_| {}), entry("b", |_| {})]);
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn conflicts_are_hard_issues() {
        let report = validate(&[
            entry("a", |t| t.conflicts_with = vec!["b".into()]),
            entry("b", |_| {}),
        ]);
        assert!(!report.valid);
        assert_eq!(report.issues[0].kind, IssueKind::Conflict);
    }

    #[test]
    fn adjacent_type_mismatch_is_flagged() {
        let report = validate(&[
            entry("bin-out", |t| t.output = DataKind::Binary),
            entry("text-in", |t| t.input = DataKind::Text),
        ]);
        assert!(!report.valid);
        assert_eq!(report.issues[0].kind, IssueKind::IncompatibleTypes);
    }

    #[test]
    fn missing_binary_dependency_is_flagged() {
        let report = validate(&[entry("needs-tool", |t| {
            t.dependencies = vec![TransformerDependency::Binary(
                "definitely-not-a-real-binary-xyz".into(),
            )];
        })]);
        assert!(!report.valid);
        assert_eq!(report.issues[0].kind, IssueKind::MissingResource);
    }

    #[test]
    fn early_heavy_work_is_a_performance_warning() {
        let report = validate(&[
            entry("slow", |t| t.heavy = true),
            entry("fast", |_| {}),
        ]);
        assert!(report.valid);
        assert_eq!(report.warnings[0].kind, IssueKind::Performance);
    }

    #[test]
    fn repeated_idempotent_entry_is_redundant() {
        let report = validate(&[
            entry("norm", |t| t.idempotent = true),
            entry("norm", |t| t.idempotent = true),
        ]);
        assert!(report.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.kind == IssueKind::Redundancy));
    }

    #[test]
    fn optimize_pushes_heavy_last() {
        let optimized = optimize(vec![
            entry("slow", |t| t.heavy = true),
            entry("fast1", |_| {}),
            entry("fast2", |_| {}),
        ]);
        let names: Vec<&str> = optimized.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["fast1", "fast2", "slow"]);
    }

    #[test]
    fn optimize_anchors_order_sensitive_entries() {
        let optimized = optimize(vec![
            entry("heavy-movable", |t| t.heavy = true),
            entry("anchored", |t| t.order_sensitive = true),
            entry("cheap", |_| {}),
        ]);
        let names: Vec<&str> = optimized.iter().map(|e| e.name.as_str()).collect();
        // `anchored` stays in slot 1; the movable slots repack around it.
        assert_eq!(names, vec!["cheap", "anchored", "heavy-movable"]);
    }
}

use serde::{Deserialize, Serialize};

/// The fixed rubric axes judges score against. Each carries a fixed
/// rational weight; the full set sums to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Independent,
    Negotiable,
    Valuable,
    Estimable,
    Small,
    Testable,
    GwtFormat,
    SchemaValid,
    Correctness,
    Completeness,
    Safety,
}

impl Criterion {
    pub const ALL: [Criterion; 11] = [
        Criterion::Independent,
        Criterion::Negotiable,
        Criterion::Valuable,
        Criterion::Estimable,
        Criterion::Small,
        Criterion::Testable,
        Criterion::GwtFormat,
        Criterion::SchemaValid,
        Criterion::Correctness,
        Criterion::Completeness,
        Criterion::Safety,
    ];

    /// Fixed weight in the overall-score formula; the full set sums to 1.
    pub fn weight(self) -> f64 {
        match self {
            Criterion::Independent => 0.08,
            Criterion::Negotiable => 0.06,
            Criterion::Valuable => 0.12,
            Criterion::Estimable => 0.08,
            Criterion::Small => 0.08,
            Criterion::Testable => 0.12,
            Criterion::GwtFormat => 0.08,
            Criterion::SchemaValid => 0.10,
            Criterion::Correctness => 0.12,
            Criterion::Completeness => 0.08,
            Criterion::Safety => 0.08,
        }
    }

    /// True for the seven INVEST axes used by `investComposite`.
    pub fn is_invest(self) -> bool {
        matches!(
            self,
            Criterion::Independent
                | Criterion::Negotiable
                | Criterion::Valuable
                | Criterion::Estimable
                | Criterion::Small
                | Criterion::Testable
        )
    }
}

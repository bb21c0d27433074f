//! Stage classification over the three index values.

use tracing::warn;

use crate::reference::{INDEX_COUNT, ReferenceData, StageDefinition};

/// Select exactly one stage for the given index values.
///
/// Stages are tried in canonical (document) order; the first matching
/// predicate wins, which resolves overlapping ranges deterministically.
/// If no predicate matches — a configuration gap, not a caller error —
/// the stage whose range centers are nearest under Euclidean distance in
/// index space is chosen, remaining ties broken by canonical order. The
/// function is total for valid numeric input.
pub fn classify<'a>(
    reference: &'a ReferenceData,
    indices: &[f64; INDEX_COUNT],
) -> &'a StageDefinition {
    let stages = reference.stages();
    if let Some(stage) = stages.iter().find(|stage| stage.matches(indices)) {
        return stage;
    }

    warn!(
        ?indices,
        "No stage predicate matched, falling back to nearest range center"
    );

    // Validation guarantees at least one stage.
    let mut best = &stages[0];
    let mut best_distance = distance(best, indices);
    for stage in &stages[1..] {
        let d = distance(stage, indices);
        if d < best_distance {
            best = stage;
            best_distance = d;
        }
    }
    best
}

/// Squared Euclidean distance from the observed indices to a stage's
/// range centers. Squared is enough for ordering.
fn distance(stage: &StageDefinition, indices: &[f64; INDEX_COUNT]) -> f64 {
    stage
        .center()
        .iter()
        .zip(indices)
        .map(|(center, value)| (center - value) * (center - value))
        .sum()
}

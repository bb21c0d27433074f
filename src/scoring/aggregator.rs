//! Dimension and index aggregation over a complete answer set.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::reference::{INDEX_COUNT, ReferenceData};

/// Computed dimension and index scores, all in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    /// Dimension id → normalized score.
    pub dimensions: BTreeMap<String, f64>,
    /// Index values, positionally aligned with [`ReferenceData::indices`].
    pub indices: [f64; INDEX_COUNT],
}

/// Aggregate a complete answer set into dimension and index scores.
///
/// Precondition: `answers` covers every question id in `reference`.
/// Anything less fails with [`EngineError::IncompleteSession`] — missing
/// answers are never zero-filled, since that would fabricate a score.
///
/// Normalization is linear against the theoretical raw-score bounds, which
/// already account for negative weights, so no clamping is needed for
/// in-scale answer values.
pub fn aggregate(
    reference: &ReferenceData,
    answers: &BTreeMap<u32, i64>,
) -> Result<Scores, EngineError> {
    let total = reference.question_count();
    let answered = reference
        .question_ids()
        .filter(|id| answers.contains_key(id))
        .count();
    if answered < total {
        return Err(EngineError::IncompleteSession { answered, total });
    }

    let mut raw: BTreeMap<&str, f64> = BTreeMap::new();
    for question in reference.questions() {
        let value = answers[&question.id] as f64;
        for (dimension, weight) in &question.weights {
            *raw.entry(dimension.as_str()).or_insert(0.0) += value * weight;
        }
    }

    let mut dimensions = BTreeMap::new();
    for dim in reference.dimensions() {
        let score = raw.get(dim.id.as_str()).copied().unwrap_or(dim.raw_min);
        dimensions.insert(dim.id.clone(), normalize(score, dim.raw_min, dim.raw_max));
    }

    let mut indices = [0.0; INDEX_COUNT];
    for (slot, index) in indices.iter_mut().zip(reference.indices()) {
        let score: f64 = index
            .weights
            .iter()
            .map(|(dimension, weight)| dimensions[dimension] * weight)
            .sum();
        *slot = normalize(score, index.raw_min, index.raw_max);
    }

    Ok(Scores {
        dimensions,
        indices,
    })
}

/// Linear map of `raw` from [min, max] onto [0, 100].
fn normalize(raw: f64, min: f64, max: f64) -> f64 {
    100.0 * (raw - min) / (max - min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::raw::ReferenceDoc;

    fn reference() -> ReferenceData {
        let doc: ReferenceDoc = serde_json::from_value(serde_json::json!({
            "dimensions": [
                {"id": "alpha", "name": "Alpha"},
                {"id": "beta", "name": "Beta"}
            ],
            "questions": [
                {"id": 1, "prompt": "q1", "scale": {"min": 1, "max": 5}, "weights": {"alpha": 1.0}},
                {"id": 2, "prompt": "q2", "scale": {"min": 1, "max": 5}, "weights": {"alpha": 1.0, "beta": 0.5}},
                {"id": 3, "prompt": "q3", "scale": {"min": 1, "max": 5}, "weights": {"beta": -1.0}}
            ],
            "indices": [
                {"id": "i1", "name": "I1", "weights": {"alpha": 1.0}},
                {"id": "i2", "name": "I2", "weights": {"beta": 1.0}},
                {"id": "i3", "name": "I3", "weights": {"alpha": 1.0, "beta": -1.0}}
            ],
            "stages": [
                {"id": "only", "name": "Only", "ranges": {}, "description": "d",
                 "risks": [], "recommended": [], "avoid": []}
            ]
        }))
        .expect("doc should deserialize");
        ReferenceData::from_doc(doc).expect("doc should validate")
    }

    fn answers(values: &[(u32, i64)]) -> BTreeMap<u32, i64> {
        values.iter().copied().collect()
    }

    #[test]
    fn incomplete_answers_rejected() {
        let reference = reference();
        let err = aggregate(&reference, &answers(&[(1, 3), (2, 3)]))
            .expect_err("incomplete set must be rejected");
        assert!(matches!(
            err,
            EngineError::IncompleteSession {
                answered: 2,
                total: 3
            }
        ));
    }

    #[test]
    fn all_minimum_answers_hit_scale_ends() {
        let reference = reference();
        // alpha raw = 1 + 1 = min; beta raw = 0.5 - 5 = min (q3 negative weight)
        let scores =
            aggregate(&reference, &answers(&[(1, 1), (2, 1), (3, 5)])).expect("complete set");
        assert_eq!(scores.dimensions["alpha"], 0.0);
        assert_eq!(scores.dimensions["beta"], 0.0);
        assert_eq!(scores.indices[0], 0.0);
        assert_eq!(scores.indices[1], 0.0);
        // i3 = alpha - beta: both at 0 → raw 0, span [-100, 100] → 50
        assert_eq!(scores.indices[2], 50.0);
    }

    #[test]
    fn all_maximum_answers_hit_scale_ends() {
        let reference = reference();
        let scores =
            aggregate(&reference, &answers(&[(1, 5), (2, 5), (3, 1)])).expect("complete set");
        assert_eq!(scores.dimensions["alpha"], 100.0);
        assert_eq!(scores.dimensions["beta"], 100.0);
        assert_eq!(scores.indices[0], 100.0);
        assert_eq!(scores.indices[1], 100.0);
        assert_eq!(scores.indices[2], 50.0);
    }

    #[test]
    fn scores_stay_in_bounds_for_every_uniform_answer() {
        let reference = reference();
        for value in 1..=5 {
            let scores = aggregate(&reference, &answers(&[(1, value), (2, value), (3, value)]))
                .expect("complete set");
            for (dimension, score) in &scores.dimensions {
                assert!(
                    (0.0..=100.0).contains(score),
                    "{dimension} out of range at value {value}: {score}"
                );
            }
            for score in scores.indices {
                assert!((0.0..=100.0).contains(&score));
            }
        }
    }

    #[test]
    fn builtin_dataset_scores_stay_in_bounds() {
        let reference = ReferenceData::builtin().expect("built-in dataset");
        for value in 1..=5 {
            let answers: BTreeMap<u32, i64> =
                reference.question_ids().map(|id| (id, value)).collect();
            let scores = aggregate(&reference, &answers).expect("complete set");
            for score in scores
                .dimensions
                .values()
                .copied()
                .chain(scores.indices.iter().copied())
            {
                assert!(
                    (0.0..=100.0).contains(&score),
                    "score out of range at uniform value {value}: {score}"
                );
            }
        }
    }

    #[test]
    fn identical_answer_sets_yield_identical_scores() {
        let reference = reference();
        let set = answers(&[(1, 4), (2, 2), (3, 3)]);
        let first = aggregate(&reference, &set).expect("complete set");
        let second = aggregate(&reference, &set.clone()).expect("complete set");
        assert_eq!(first, second);
    }
}

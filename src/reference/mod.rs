//! Immutable reference data: questions, dimensions, indices, and stage
//! definitions.
//!
//! Loaded once at startup, validated eagerly, then shared read-only across
//! all sessions as `Arc<ReferenceData>`. No component mutates it afterward.

pub mod raw;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ReferenceDataError;

use raw::ReferenceDoc;

/// Number of published top-level indices.
pub const INDEX_COUNT: usize = 3;

/// Built-in reference dataset (24 questions, 8 dimensions, 3 indices,
/// 8 Adizes stages).
const BUILTIN_JSON: &str = include_str!("../../data/reference.json");

/// The permissible answer values of a question, as an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerScale {
    pub min: i64,
    pub max: i64,
}

impl AnswerScale {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// A single questionnaire item. The prompt is opaque to the engine.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub scale: AnswerScale,
    /// Dimension id → signed weight.
    pub weights: BTreeMap<String, f64>,
}

/// An intermediate weighted aggregate over a subset of questions.
///
/// `raw_min`/`raw_max` are the theoretical raw-score bounds derived from
/// the contributing questions' scales and weight signs; they are what the
/// aggregator normalizes against.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub id: String,
    pub name: String,
    pub raw_min: f64,
    pub raw_max: f64,
}

/// One of the three published 0–100 indices, defined as a weighted
/// combination of dimension scores.
#[derive(Debug, Clone)]
pub struct IndexDef {
    pub id: String,
    pub name: String,
    /// Dimension id → signed weight.
    pub weights: BTreeMap<String, f64>,
    pub raw_min: f64,
    pub raw_max: f64,
}

/// A half-open-or-closed matching range over one index. A missing bound
/// means "unbounded" on that side.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl IndexRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|m| value >= m) && self.max.is_none_or(|m| value <= m)
    }

    /// Range center used by the classifier's nearest-stage fallback.
    /// Missing bounds default to the index domain ends (0 and 100).
    pub fn center(&self) -> f64 {
        (self.min.unwrap_or(0.0) + self.max.unwrap_or(100.0)) / 2.0
    }
}

/// A lifecycle stage with its classification predicate and diagnostic text.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub id: String,
    pub name: String,
    /// Per-index ranges, positionally aligned with [`ReferenceData::indices`].
    pub ranges: [IndexRange; INDEX_COUNT],
    pub description: String,
    pub risks: Vec<String>,
    pub recommended: Vec<String>,
    pub avoid: Vec<String>,
}

impl StageDefinition {
    /// Whether all three index values fall inside this stage's ranges.
    pub fn matches(&self, indices: &[f64; INDEX_COUNT]) -> bool {
        self.ranges
            .iter()
            .zip(indices)
            .all(|(range, value)| range.contains(*value))
    }

    /// The stage's defining point in index space.
    pub fn center(&self) -> [f64; INDEX_COUNT] {
        [
            self.ranges[0].center(),
            self.ranges[1].center(),
            self.ranges[2].center(),
        ]
    }
}

/// Validated, immutable reference data.
#[derive(Debug)]
pub struct ReferenceData {
    questions: Vec<Question>,
    question_index: BTreeMap<u32, usize>,
    dimensions: Vec<Dimension>,
    indices: Vec<IndexDef>,
    stages: Vec<StageDefinition>,
}

impl ReferenceData {
    /// Parse and validate the built-in dataset.
    pub fn builtin() -> Result<Self, ReferenceDataError> {
        let doc: ReferenceDoc = serde_json::from_str(BUILTIN_JSON)?;
        Self::from_doc(doc)
    }

    /// Load and validate a reference-data document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReferenceDataError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let doc: ReferenceDoc = serde_json::from_str(&text)?;
        Self::from_doc(doc)
    }

    /// Validate a parsed document into immutable reference data.
    ///
    /// Any inconsistency fails here, before a single session can be
    /// created — the engine never partially initializes.
    pub fn from_doc(doc: ReferenceDoc) -> Result<Self, ReferenceDataError> {
        if doc.questions.is_empty() {
            return Err(ReferenceDataError::NoQuestions);
        }

        // Dimensions: unique ids.
        let mut dimension_ids = BTreeSet::new();
        for dim in &doc.dimensions {
            if !dimension_ids.insert(dim.id.clone()) {
                return Err(ReferenceDataError::DuplicateDimensionId(dim.id.clone()));
            }
        }

        // Questions: unique ids, sane scales, weights against known dimensions.
        let mut question_index = BTreeMap::new();
        let mut questions = Vec::with_capacity(doc.questions.len());
        for (pos, q) in doc.questions.iter().enumerate() {
            if question_index.insert(q.id, pos).is_some() {
                return Err(ReferenceDataError::DuplicateQuestionId(q.id));
            }
            if q.scale.min >= q.scale.max {
                return Err(ReferenceDataError::DegenerateScale {
                    id: q.id,
                    min: q.scale.min,
                    max: q.scale.max,
                });
            }
            if q.weights.is_empty() {
                return Err(ReferenceDataError::UnweightedQuestion { id: q.id });
            }
            for dim in q.weights.keys() {
                if !dimension_ids.contains(dim) {
                    return Err(ReferenceDataError::UnknownDimension {
                        question: q.id,
                        dimension: dim.clone(),
                    });
                }
            }
            questions.push(Question {
                id: q.id,
                prompt: q.prompt.clone(),
                scale: AnswerScale {
                    min: q.scale.min,
                    max: q.scale.max,
                },
                weights: q.weights.clone(),
            });
        }

        // Dimension spans: theoretical raw min/max, respecting weight signs.
        let mut dimensions = Vec::with_capacity(doc.dimensions.len());
        for dim in &doc.dimensions {
            let mut raw_min = 0.0;
            let mut raw_max = 0.0;
            let mut fed = false;
            for q in &questions {
                if let Some(&w) = q.weights.get(&dim.id) {
                    fed = true;
                    let (lo, hi) = (q.scale.min as f64, q.scale.max as f64);
                    if w >= 0.0 {
                        raw_min += w * lo;
                        raw_max += w * hi;
                    } else {
                        raw_min += w * hi;
                        raw_max += w * lo;
                    }
                }
            }
            if !fed {
                return Err(ReferenceDataError::EmptyDimension(dim.id.clone()));
            }
            if raw_max <= raw_min {
                return Err(ReferenceDataError::ZeroSpanDimension(dim.id.clone()));
            }
            dimensions.push(Dimension {
                id: dim.id.clone(),
                name: dim.name.clone(),
                raw_min,
                raw_max,
            });
        }

        // Indices: exactly INDEX_COUNT, unique, known dimensions, non-zero span.
        if doc.indices.len() != INDEX_COUNT {
            return Err(ReferenceDataError::IndexCount {
                expected: INDEX_COUNT,
                found: doc.indices.len(),
            });
        }
        let mut index_ids = BTreeSet::new();
        let mut indices = Vec::with_capacity(INDEX_COUNT);
        for idx in &doc.indices {
            if !index_ids.insert(idx.id.clone()) {
                return Err(ReferenceDataError::DuplicateIndexId(idx.id.clone()));
            }
            let mut raw_min = 0.0;
            let mut raw_max = 0.0;
            for (dim, &w) in &idx.weights {
                if !dimension_ids.contains(dim) {
                    return Err(ReferenceDataError::IndexUnknownDimension {
                        index: idx.id.clone(),
                        dimension: dim.clone(),
                    });
                }
                // Dimension scores live in [0, 100].
                if w >= 0.0 {
                    raw_max += w * 100.0;
                } else {
                    raw_min += w * 100.0;
                }
            }
            if raw_max <= raw_min {
                return Err(ReferenceDataError::ZeroSpanIndex(idx.id.clone()));
            }
            indices.push(IndexDef {
                id: idx.id.clone(),
                name: idx.name.clone(),
                weights: idx.weights.clone(),
                raw_min,
                raw_max,
            });
        }

        // Stages: canonical order preserved, ranges against known indices.
        if doc.stages.is_empty() {
            return Err(ReferenceDataError::NoStages);
        }
        let mut stage_ids = BTreeSet::new();
        let mut stages = Vec::with_capacity(doc.stages.len());
        for stage in &doc.stages {
            if !stage_ids.insert(stage.id.clone()) {
                return Err(ReferenceDataError::DuplicateStageId(stage.id.clone()));
            }
            for index_id in stage.ranges.keys() {
                if !index_ids.contains(index_id) {
                    return Err(ReferenceDataError::StageUnknownIndex {
                        stage: stage.id.clone(),
                        index: index_id.clone(),
                    });
                }
            }
            let mut ranges = [IndexRange::default(); INDEX_COUNT];
            for (slot, idx) in ranges.iter_mut().zip(&indices) {
                if let Some(range) = stage.ranges.get(&idx.id) {
                    if matches!((range.min, range.max), (Some(min), Some(max)) if min > max) {
                        return Err(ReferenceDataError::EmptyStageRange {
                            stage: stage.id.clone(),
                            index: idx.id.clone(),
                        });
                    }
                    *slot = IndexRange {
                        min: range.min,
                        max: range.max,
                    };
                }
            }
            stages.push(StageDefinition {
                id: stage.id.clone(),
                name: stage.name.clone(),
                ranges,
                description: stage.description.clone(),
                risks: stage.risks.clone(),
                recommended: stage.recommended.clone(),
                avoid: stage.avoid.clone(),
            });
        }

        Ok(Self {
            questions,
            question_index,
            dimensions,
            indices,
            stages,
        })
    }

    /// All questions, in document order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Look up a question by id.
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.question_index.get(&id).map(|&pos| &self.questions[pos])
    }

    /// All question ids, ascending.
    pub fn question_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.question_index.keys().copied()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// The three published indices, in document order.
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    /// Stage definitions in canonical (classifier tie-break) order.
    /// Validation guarantees at least one stage.
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc() -> serde_json::Value {
        serde_json::json!({
            "dimensions": [
                {"id": "alpha", "name": "Alpha"},
                {"id": "beta", "name": "Beta"}
            ],
            "questions": [
                {"id": 1, "prompt": "q1", "scale": {"min": 1, "max": 5}, "weights": {"alpha": 1.0}},
                {"id": 2, "prompt": "q2", "scale": {"min": 1, "max": 5}, "weights": {"beta": -1.0}},
                {"id": 3, "prompt": "q3", "scale": {"min": 1, "max": 5}, "weights": {"alpha": 0.5, "beta": 1.0}}
            ],
            "indices": [
                {"id": "i1", "name": "I1", "weights": {"alpha": 1.0}},
                {"id": "i2", "name": "I2", "weights": {"beta": 1.0}},
                {"id": "i3", "name": "I3", "weights": {"alpha": 0.5, "beta": -0.5}}
            ],
            "stages": [
                {
                    "id": "low", "name": "Low",
                    "ranges": {"i1": {"min": 0.0, "max": 50.0}},
                    "description": "low", "risks": [], "recommended": [], "avoid": []
                },
                {
                    "id": "high", "name": "High",
                    "ranges": {"i1": {"min": 50.0, "max": 100.0}},
                    "description": "high", "risks": [], "recommended": [], "avoid": []
                }
            ]
        })
    }

    fn parse(value: serde_json::Value) -> Result<ReferenceData, ReferenceDataError> {
        let doc: ReferenceDoc = serde_json::from_value(value).expect("doc should deserialize");
        ReferenceData::from_doc(doc)
    }

    #[test]
    fn minimal_doc_validates() {
        let data = parse(minimal_doc()).expect("minimal doc should validate");
        assert_eq!(data.question_count(), 3);
        assert_eq!(data.indices().len(), INDEX_COUNT);
        assert_eq!(data.stages().len(), 2);
        assert!(data.question(2).is_some());
        assert!(data.question(99).is_none());
    }

    #[test]
    fn builtin_dataset_validates() {
        let data = ReferenceData::builtin().expect("built-in dataset should validate");
        assert_eq!(data.question_count(), 24);
        assert_eq!(data.indices().len(), 3);
        assert_eq!(data.stages().len(), 8);
        // Document order is canonical order.
        assert_eq!(data.stages()[0].id, "infancy");
        assert_eq!(data.stages()[7].id, "bureaucracy");
    }

    #[test]
    fn duplicate_question_id_rejected() {
        let mut doc = minimal_doc();
        doc["questions"][1]["id"] = serde_json::json!(1);
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::DuplicateQuestionId(1))
        ));
    }

    #[test]
    fn unknown_dimension_rejected() {
        let mut doc = minimal_doc();
        doc["questions"][0]["weights"] = serde_json::json!({"gamma": 1.0});
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::UnknownDimension { question: 1, .. })
        ));
    }

    #[test]
    fn degenerate_scale_rejected() {
        let mut doc = minimal_doc();
        doc["questions"][0]["scale"] = serde_json::json!({"min": 3, "max": 3});
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::DegenerateScale { id: 1, .. })
        ));
    }

    #[test]
    fn wrong_index_count_rejected() {
        let mut doc = minimal_doc();
        doc["indices"]
            .as_array_mut()
            .expect("indices array")
            .pop();
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::IndexCount {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn inverted_stage_range_rejected() {
        let mut doc = minimal_doc();
        doc["stages"][0]["ranges"]["i1"] = serde_json::json!({"min": 80.0, "max": 20.0});
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::EmptyStageRange { .. })
        ));
    }

    #[test]
    fn stage_with_unknown_index_rejected() {
        let mut doc = minimal_doc();
        doc["stages"][0]["ranges"]["nope"] = serde_json::json!({"min": 0.0, "max": 10.0});
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::StageUnknownIndex { .. })
        ));
    }

    #[test]
    fn unfed_dimension_rejected() {
        let mut doc = minimal_doc();
        doc["dimensions"]
            .as_array_mut()
            .expect("dimensions array")
            .push(serde_json::json!({"id": "gamma", "name": "Gamma"}));
        assert!(matches!(
            parse(doc),
            Err(ReferenceDataError::EmptyDimension(id)) if id == "gamma"
        ));
    }

    #[test]
    fn negative_weights_widen_spans_correctly() {
        let data = parse(minimal_doc()).expect("doc should validate");
        // beta: q2 weight -1.0 over 1..=5 plus q3 weight 1.0 over 1..=5
        // min = -5 + 1 = -4, max = -1 + 5 = 4
        let beta = data
            .dimensions()
            .iter()
            .find(|d| d.id == "beta")
            .expect("beta dimension");
        assert_eq!(beta.raw_min, -4.0);
        assert_eq!(beta.raw_max, 4.0);
    }

    #[test]
    fn index_range_contains_and_center() {
        let range = IndexRange {
            min: Some(20.0),
            max: Some(60.0),
        };
        assert!(range.contains(20.0));
        assert!(range.contains(60.0));
        assert!(!range.contains(60.1));
        assert_eq!(range.center(), 40.0);

        let open = IndexRange::default();
        assert!(open.contains(0.0));
        assert!(open.contains(100.0));
        assert_eq!(open.center(), 50.0);
    }
}

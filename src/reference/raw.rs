//! Serde input format for the reference-data document.
//!
//! Loosely-typed on purpose: everything here is validated eagerly into
//! [`super::ReferenceData`] at load time, so the rest of the engine never
//! sees a malformed weight map or an inverted range.

use std::collections::BTreeMap;

use serde::Deserialize;

/// The whole reference-data document. Order of `indices` and `stages` is
/// significant: it defines index positions and classifier tie-break order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceDoc {
    pub dimensions: Vec<DimensionDoc>,
    pub questions: Vec<QuestionDoc>,
    pub indices: Vec<IndexDoc>,
    pub stages: Vec<StageDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionDoc {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDoc {
    pub id: u32,
    pub prompt: String,
    pub scale: ScaleDoc,
    /// Dimension id → signed weight.
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScaleDoc {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDoc {
    pub id: String,
    pub name: String,
    /// Dimension id → signed weight.
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageDoc {
    pub id: String,
    pub name: String,
    /// Index id → matching range. A missing index means "any value".
    #[serde(default)]
    pub ranges: BTreeMap<String, RangeDoc>,
    pub description: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub recommended: Vec<String>,
    #[serde(default)]
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeDoc {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

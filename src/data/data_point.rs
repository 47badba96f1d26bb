use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A pair of corresponding coordinates: `source` in the transformed run, `target` in the
/// reference frame, and an optional free-text `note` (e.g. a peptide sequence)
///
/// Ordering and equality are total: coordinates are compared with [f64::total_cmp], then the
/// note is compared lexicographically. Consequently `0.0` and `-0.0` are different points and
/// `NaN` equals itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct DataPoint {
    pub source: f64,
    pub target: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Coordinate-pair store, kept in the order supplied by the caller
pub type DataPoints = Vec<DataPoint>;

impl DataPoint {
    pub fn new(source: f64, target: f64) -> Self {
        Self {
            source,
            target,
            note: String::new(),
        }
    }

    pub fn with_note(source: f64, target: f64, note: impl Into<String>) -> Self {
        Self {
            source,
            target,
            note: note.into(),
        }
    }

    /// The same correspondence seen from the other side
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
            note: self.note.clone(),
        }
    }
}

impl From<(f64, f64)> for DataPoint {
    fn from((source, target): (f64, f64)) -> Self {
        Self::new(source, target)
    }
}

impl From<(f64, f64, &str)> for DataPoint {
    fn from((source, target, note): (f64, f64, &str)) -> Self {
        Self::with_note(source, target, note)
    }
}

impl PartialEq for DataPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DataPoint {}

impl PartialOrd for DataPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .total_cmp(&other.source)
            .then_with(|| self.target.total_cmp(&other.target))
            .then_with(|| self.note.cmp(&other.note))
    }
}

impl Hash for DataPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.to_bits().hash(state);
        self.target.to_bits().hash(state);
        self.note.hash(state);
    }
}

/// Builds a coordinate-pair store from `(source, target)` tuples
pub fn data_points_from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> DataPoints {
    pairs.into_iter().map(DataPoint::from).collect()
}

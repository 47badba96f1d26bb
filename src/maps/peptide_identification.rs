use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PeptideHit {
    pub sequence: String,
    pub score: f64,
}

impl PeptideHit {
    pub fn new(sequence: impl Into<String>, score: f64) -> Self {
        Self {
            sequence: sequence.into(),
            score,
        }
    }
}

/// Peptide search result for a single precursor, hits in any order
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PeptideIdentification {
    pub rt: f64,
    pub mz: f64,
    pub hits: Vec<PeptideHit>,
    pub higher_score_better: bool,
    #[serde(default)]
    pub original_rt: Option<f64>,
}

impl Default for PeptideIdentification {
    fn default() -> Self {
        Self {
            rt: 0.0,
            mz: 0.0,
            hits: vec![],
            higher_score_better: true,
            original_rt: None,
        }
    }
}

impl PeptideIdentification {
    pub fn new(rt: f64, mz: f64, hits: Vec<PeptideHit>) -> Self {
        Self {
            rt,
            mz,
            hits,
            ..Self::default()
        }
    }

    pub fn with_higher_score_better(mut self, higher_score_better: bool) -> Self {
        self.higher_score_better = higher_score_better;
        self
    }

    /// Hit with the best score according to `higher_score_better`, NaN scores are never best
    pub fn best_hit(&self) -> Option<&PeptideHit> {
        let better = |a: &PeptideHit, b: &PeptideHit| {
            if self.higher_score_better {
                a.score > b.score
            } else {
                a.score < b.score
            }
        };
        self.hits
            .iter()
            .filter(|hit| !hit.score.is_nan())
            .fold(None, |best: Option<&PeptideHit>, hit| match best {
                Some(best) if !better(hit, best) => Some(best),
                _ => Some(hit),
            })
    }
}

use crate::maps::peptide_identification::PeptideIdentification;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference from a consensus feature to the feature of one run
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FeatureHandle {
    pub map_index: usize,
    pub rt: f64,
    pub mz: f64,
    pub intensity: f64,
}

/// Group of corresponding features across runs
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConsensusFeature {
    pub rt: f64,
    pub mz: f64,
    pub intensity: f64,
    pub handles: Vec<FeatureHandle>,
    pub peptide_identifications: Vec<PeptideIdentification>,
    #[serde(default)]
    pub original_rt: Option<f64>,
}

impl ConsensusFeature {
    pub fn new(rt: f64, mz: f64, intensity: f64) -> Self {
        Self {
            rt,
            mz,
            intensity,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConsensusMap {
    pub features: Vec<ConsensusFeature>,
    pub unassigned_peptide_identifications: Vec<PeptideIdentification>,
}

impl ConsensusMap {
    pub fn new(features: Vec<ConsensusFeature>) -> Self {
        Self {
            features,
            unassigned_peptide_identifications: vec![],
        }
    }
}

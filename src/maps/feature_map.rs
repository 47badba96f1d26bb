use crate::maps::consensus_map::ConsensusMap;
use crate::maps::peptide_identification::PeptideIdentification;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Quantified analyte of a single run
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Feature {
    pub rt: f64,
    pub mz: f64,
    pub intensity: f64,
    pub peptide_identifications: Vec<PeptideIdentification>,
    #[serde(default)]
    pub original_rt: Option<f64>,
}

impl Feature {
    pub fn new(rt: f64, mz: f64, intensity: f64) -> Self {
        Self {
            rt,
            mz,
            intensity,
            ..Self::default()
        }
    }

    pub fn with_identifications(mut self, ids: Vec<PeptideIdentification>) -> Self {
        self.peptide_identifications = ids;
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FeatureMap {
    pub features: Vec<Feature>,
    /// Identifications not matched to any feature
    pub unassigned_peptide_identifications: Vec<PeptideIdentification>,
}

impl FeatureMap {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            unassigned_peptide_identifications: vec![],
        }
    }
}

/// Every consensus feature becomes one feature with the consensus position and identifications
impl From<&ConsensusMap> for FeatureMap {
    fn from(map: &ConsensusMap) -> Self {
        Self {
            features: map
                .features
                .iter()
                .map(|cf| Feature {
                    rt: cf.rt,
                    mz: cf.mz,
                    intensity: cf.intensity,
                    peptide_identifications: cf.peptide_identifications.clone(),
                    original_rt: None,
                })
                .collect(),
            unassigned_peptide_identifications: map.unassigned_peptide_identifications.clone(),
        }
    }
}

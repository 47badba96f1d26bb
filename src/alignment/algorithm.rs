use crate::alignment::info::AlignmentInfoTrait;
use crate::alignment::reference::Reference;
use crate::description::TransformationDescription;
use crate::error::AlignmentError;
use crate::maps::{
    ApplyTransformation, CompactMap, ConsensusMap, FeatureMap, PeakMap, PeptideIdentification,
};
use crate::model::ModelType;
use crate::params::Params;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Model fitted to the data points an alignment algorithm produces
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ModelSpec {
    pub model_type: String,
    #[serde(default)]
    pub params: Params,
}

impl ModelSpec {
    pub fn new(model_type: impl Into<String>, params: Params) -> Self {
        Self {
            model_type: model_type.into(),
            params,
        }
    }

    /// Fit every description but the identity ones, see [fit_model]
    pub fn fit(&self, trafos: &mut [TransformationDescription]) -> Result<(), AlignmentError> {
        fit_model(&self.model_type, &self.params, trafos)
    }
}

/// Smoothing spline with default parameters
impl Default for ModelSpec {
    fn default() -> Self {
        Self::new(ModelType::BSpline.name(), Params::new())
    }
}

/// Fit a model to every description whose model type is not `identity`
///
/// Identity descriptions mark reference runs and are never refitted.
pub fn fit_model(
    model_type: &str,
    params: &Params,
    trafos: &mut [TransformationDescription],
) -> Result<(), AlignmentError> {
    trafos
        .iter_mut()
        .filter(|trafo| trafo.model_type() != ModelType::Identity.name())
        .try_for_each(|trafo| trafo.fit_model(model_type, params))
}

fn not_implemented(algorithm: &'static str, operation: &'static str) -> AlignmentError {
    AlignmentError::NotImplemented {
        algorithm,
        operation,
    }
}

/// Retention time alignment of several runs
///
/// Every `align_*` method returns one description per input, in input order, that maps the
/// retention times of that input into the common reference frame. Inputs an algorithm does not
/// implement fail with [AlignmentError::NotImplemented].
pub trait MapAlignmentAlgorithm: AlignmentInfoTrait + Debug + Send + Sync {
    /// Choose the reference frame, `None` lets the algorithm decide
    ///
    /// Fails with [AlignmentError::InvalidParameter] for algorithms without reference support.
    fn set_reference(&mut self, reference: Option<Reference>) -> Result<(), AlignmentError> {
        match reference {
            None => Ok(()),
            Some(_) => Err(AlignmentError::InvalidParameter(format!(
                "{} does not support choosing a reference",
                self.info().name
            ))),
        }
    }

    fn reference(&self) -> Option<&Reference> {
        None
    }

    fn align_peak_maps(
        &self,
        _maps: &[PeakMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        Err(not_implemented(self.info().name, "align_peak_maps"))
    }

    fn align_compact_maps(
        &self,
        _maps: &[CompactMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        Err(not_implemented(self.info().name, "align_compact_maps"))
    }

    fn align_feature_maps(
        &self,
        _maps: &[FeatureMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        Err(not_implemented(self.info().name, "align_feature_maps"))
    }

    /// Aligns the consensus features as feature maps and moves the consensus maps accordingly
    fn align_consensus_maps(
        &self,
        maps: &mut [ConsensusMap],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        let feature_maps: Vec<_> = maps.iter().map(FeatureMap::from).collect();
        let trafos = self
            .align_feature_maps(&feature_maps)
            .map_err(|err| match err {
                AlignmentError::NotImplemented { algorithm, .. } => {
                    not_implemented(algorithm, "align_consensus_maps")
                }
                err => err,
            })?;
        for (map, trafo) in maps.iter_mut().zip(&trafos) {
            map.transform_retention_times(trafo, false);
        }
        Ok(trafos)
    }

    fn align_peptide_identifications(
        &self,
        _runs: &[Vec<PeptideIdentification>],
    ) -> Result<Vec<TransformationDescription>, AlignmentError> {
        Err(not_implemented(self.info().name, "align_peptide_identifications"))
    }
}

#![doc = include_str!("../README.md")]


#[macro_use]
mod macros;

pub mod alignment;
pub use alignment::{
    AlignmentInfo, AlignmentInfoTrait, IdentificationAlignment, IdentificationAlignmentParams,
    InputKind, MapAlignmentAlgorithm, ModelSpec, Reference, SpectrumAlignment,
    SpectrumAlignmentParams, fit_model,
};

mod data;
pub use data::{DataPoint, DataPoints, SortedArray, data_points_from_pairs};

mod description;
pub use description::{
    DeviationStatistics, INVERSION_GRID_SIZE, NO_MODEL, STATISTICS_PERCENTILES,
    TransformationDescription,
};

mod error;
pub use error::{AlignmentError, SortedArrayError};

pub mod maps;
pub use maps::{
    ApplyTransformation, CompactMap, CompactPeak, ConsensusFeature, ConsensusMap, Feature,
    FeatureHandle, FeatureMap, Peak, PeakMap, PeptideHit, PeptideIdentification, Spectrum,
};

pub mod model;
pub use model::{
    Axis, AxisWeighting, BSplineExtrapolation, BSplineModel, ExtrapolationType, IdentityModel,
    InterpolatedModel, InterpolationType, LinearModel, LowessModel, ModelType,
    TransformationModel, TransformationModelTrait, WeightFunction, Weighting,
};

mod params;
pub use params::{ParamValue, Params};

pub mod prelude;

pub mod registry;
pub use registry::{ALGORITHM_REGISTRY, AlgorithmRegistry, MODEL_REGISTRY, ModelRegistry, Registry};

mod straight_line_fit;
#[doc(hidden)]
pub use straight_line_fit::{StraightLineFitterResult, fit_straight_line};

pub use ndarray;

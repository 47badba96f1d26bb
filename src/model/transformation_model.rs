pub(super) use crate::data::DataPoint;
pub(super) use crate::error::AlignmentError;
pub(super) use crate::model::weighting::Weighting;
pub(super) use crate::params::Params;

use enum_dispatch::enum_dispatch;
pub(super) use macro_const::macro_const;
pub(super) use schemars::JsonSchema;
pub(super) use serde::{Deserialize, Serialize};
use std::fmt;
pub(super) use std::fmt::Debug;
use std::str::FromStr;

/// Name of every built-in model kind
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Identity,
    Linear,
    Interpolated,
    BSpline,
    Lowess,
}

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        Self::Identity,
        Self::Linear,
        Self::Interpolated,
        Self::BSpline,
        Self::Lowess,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Linear => "linear",
            Self::Interpolated => "interpolated",
            Self::BSpline => "b_spline",
            Self::Lowess => "lowess",
        }
    }

    /// Whether the inverse is computed analytically rather than by resampling
    pub const fn has_closed_form_inverse(self) -> bool {
        matches!(self, Self::Identity | Self::Linear)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelType {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                AlignmentError::invalid_choice("model_type", s, Self::ALL.map(Self::name))
            })
    }
}

#[enum_dispatch]
pub trait TransformationModelTrait: Clone + Debug + Send + Sync {
    fn model_type(&self) -> ModelType;

    /// Pre-fit weighting of the data, [Weighting::default] means no weighting
    fn weighting(&self) -> &Weighting;

    /// Evaluate the fitted curve in weighted coordinates
    fn evaluate_weighted(&self, x: f64) -> f64;

    /// Map a source coordinate to the target frame
    ///
    /// Total for finite input: outside of the fitted domain the model extrapolates.
    fn evaluate(&self, x: f64) -> f64 {
        let weighting = self.weighting();
        weighting
            .y
            .unweight(self.evaluate_weighted(weighting.x.weight(x)))
    }

    /// Fit parameters together with the weighting configuration
    fn parameters(&self) -> Params;

    /// Range of source coordinates the model was fitted to, `None` for models without data
    fn domain(&self) -> Option<(f64, f64)>;

    /// Analytic inverse, `None` if the model has to be inverted numerically
    fn closed_form_inverse(&self) -> Option<Result<TransformationModel, AlignmentError>>;
}

/// All transformation models are available as variants of this enum
#[enum_dispatch(TransformationModelTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum TransformationModel {
    Identity(super::identity::IdentityModel),
    Linear(super::linear::LinearModel),
    Interpolated(super::interpolated::InterpolatedModel),
    BSpline(super::b_spline::BSplineModel),
    Lowess(super::lowess::LowessModel),
}

impl TransformationModel {
    /// Fit a built-in model of the given kind
    pub fn fit(
        model_type: ModelType,
        data: &[DataPoint],
        params: &Params,
    ) -> Result<Self, AlignmentError> {
        log::debug!("fitting {model_type} model to {} data points", data.len());
        Ok(match model_type {
            ModelType::Identity => super::identity::IdentityModel::fit(data, params)?.into(),
            ModelType::Linear => super::linear::LinearModel::fit(data, params)?.into(),
            ModelType::Interpolated => {
                super::interpolated::InterpolatedModel::fit(data, params)?.into()
            }
            ModelType::BSpline => super::b_spline::BSplineModel::fit(data, params)?.into(),
            ModelType::Lowess => super::lowess::LowessModel::fit(data, params)?.into(),
        })
    }
}

/// Smallest and largest source coordinate, `None` for empty data
pub(super) fn source_range(data: &[DataPoint]) -> Option<(f64, f64)> {
    data.iter().map(|p| p.source).fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((min, max)) => Some((min.min(x), max.max(x))),
    })
}

/// Weighted points as `(x, y)` pairs sorted by `x`, fails on non-finite coordinates
pub(super) fn sorted_weighted_pairs(
    model: &'static str,
    data: &[DataPoint],
    weighting: &Weighting,
) -> Result<Vec<(f64, f64)>, AlignmentError> {
    let mut pairs: Vec<_> = data
        .iter()
        .map(|p| (weighting.x.weight(p.source), weighting.y.weight(p.target)))
        .collect();
    if let Some(&(x, y)) = pairs.iter().find(|(x, y)| !(x.is_finite() && y.is_finite())) {
        return Err(AlignmentError::unable_to_fit(
            model,
            format!("non-finite weighted data point ({x}, {y})"),
        ));
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(pairs)
}

/// Straight line `slope * x + intercept`, used for extrapolation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn through(x: f64, y: f64, slope: f64) -> Self {
        Self {
            slope,
            intercept: y - slope * x,
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

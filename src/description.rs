use crate::data::{DataPoint, DataPoints, SortedArray};
use crate::error::AlignmentError;
use crate::model::weighting::swap_weighting_params;
use crate::model::{ModelType, TransformationModel, TransformationModelTrait};
use crate::params::Params;
use crate::registry::{MODEL_REGISTRY, ModelRegistry};

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Model type of a description without a fitted model
pub const NO_MODEL: &str = "none";

/// Number of evenly spaced samples, both domain bounds included, used to invert models without
/// a closed-form inverse
pub const INVERSION_GRID_SIZE: usize = 1000;

/// Percentiles reported by [TransformationDescription::statistics]
pub const STATISTICS_PERCENTILES: [u8; 7] = [100, 99, 95, 90, 75, 50, 25];

/// Coordinate-pair store together with the model fitted to it
///
/// Replacing the data points always discards the model. Without a model [apply] is the
/// identity.
///
/// Deserialization rejects a `model_type` that disagrees with the stored model: `"none"` if and
/// only if there is no model, and a built-in model type name must match the model variant.
///
/// [apply]: TransformationDescription::apply
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(try_from = "TransformationDescriptionParameters")]
pub struct TransformationDescription {
    model_type: String,
    data: DataPoints,
    model: Option<TransformationModel>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename = "TransformationDescription")]
struct TransformationDescriptionParameters {
    model_type: String,
    data: DataPoints,
    model: Option<TransformationModel>,
}

impl TryFrom<TransformationDescriptionParameters> for TransformationDescription {
    type Error = AlignmentError;

    fn try_from(p: TransformationDescriptionParameters) -> Result<Self, Self::Error> {
        let consistent = match &p.model {
            None => p.model_type == NO_MODEL,
            Some(model) => match p.model_type.parse::<ModelType>() {
                Ok(model_type) => model_type == model.model_type(),
                // custom registry name
                Err(_) => p.model_type != NO_MODEL,
            },
        };
        if !consistent {
            let fitted = p.model.as_ref().map_or(NO_MODEL, |m| m.model_type().name());
            return Err(AlignmentError::InvalidParameter(format!(
                "model_type {:?} does not name the stored model {fitted:?}",
                p.model_type
            )));
        }
        Ok(Self {
            model_type: p.model_type,
            data: p.data,
            model: p.model,
        })
    }
}

impl Default for TransformationDescription {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformationDescription {
    pub fn new() -> Self {
        Self::from_data_points(DataPoints::new())
    }

    pub fn from_data_points(data: DataPoints) -> Self {
        Self {
            model_type: NO_MODEL.to_owned(),
            data,
            model: None,
        }
    }

    /// Description already carrying the identity model, used for reference runs
    pub fn identity() -> Self {
        Self {
            model_type: ModelType::Identity.name().to_owned(),
            data: DataPoints::new(),
            model: Some(crate::model::IdentityModel::new().into()),
        }
    }

    /// Replace the data points, discarding the fitted model
    pub fn set_data_points(&mut self, data: DataPoints) {
        self.data = data;
        self.model = None;
        self.model_type = NO_MODEL.to_owned();
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data
    }

    /// Name of the fitted model, `"none"` without a model
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn model(&self) -> Option<&TransformationModel> {
        self.model.as_ref()
    }

    /// Parameters of the fitted model, empty without a model
    pub fn model_params(&self) -> Params {
        self.model
            .as_ref()
            .map(TransformationModelTrait::parameters)
            .unwrap_or_default()
    }

    /// Fit a model from the default registry to the current data points
    ///
    /// `"none"` removes the model. On failure the description is left unchanged.
    pub fn fit_model(&mut self, model_type: &str, params: &Params) -> Result<(), AlignmentError> {
        self.fit_model_with(&MODEL_REGISTRY, model_type, params)
    }

    /// [TransformationDescription::fit_model] with a custom model registry
    pub fn fit_model_with(
        &mut self,
        registry: &ModelRegistry,
        model_type: &str,
        params: &Params,
    ) -> Result<(), AlignmentError> {
        if model_type == NO_MODEL {
            params.reader().finish()?;
            self.model = None;
        } else {
            self.model = Some(registry.create(model_type, &self.data, params)?);
        }
        self.model_type = model_type.to_owned();
        Ok(())
    }

    /// Map a coordinate through the model, the identity without a model
    pub fn apply(&self, value: f64) -> f64 {
        match &self.model {
            Some(model) => model.evaluate(value),
            None => value,
        }
    }

    /// Replace the model by its inverse and swap source and target of every data point
    ///
    /// Models without a closed-form inverse are sampled at [INVERSION_GRID_SIZE] points across
    /// the source range of their data, and a model of the same type with the same parameters
    /// (weighting axes swapped) is fitted to the swapped samples. The result is only meaningful
    /// for monotonic models.
    pub fn invert(&mut self) -> Result<(), AlignmentError> {
        let inverse = match &self.model {
            None => None,
            Some(model) => Some(match model.closed_form_inverse() {
                Some(inverse) => inverse?,
                None => resampled_inverse(model)?,
            }),
        };
        self.model = inverse;
        self.data = self.data.iter().map(DataPoint::swapped).collect();
        Ok(())
    }

    /// Differences `target - source`, or `target - apply(source)` with `use_model`
    pub fn deviations(&self, use_model: bool, sorted: bool) -> Vec<f64> {
        let deviations = self.data.iter().map(|p| {
            let source = if use_model {
                self.apply(p.source)
            } else {
                p.source
            };
            p.target - source
        });
        if sorted {
            deviations.sorted_by(f64::total_cmp).collect()
        } else {
            deviations.collect()
        }
    }

    /// Absolute deviations before and after the transformation at [STATISTICS_PERCENTILES]
    ///
    /// Empty without data points.
    pub fn statistics(&self) -> Vec<DeviationStatistics> {
        if self.data.is_empty() {
            return vec![];
        }
        let absolute = |use_model| -> SortedArray {
            self.deviations(use_model, false)
                .into_iter()
                .map(f64::abs)
                .collect()
        };
        let (before, after) = (absolute(false), absolute(true));
        STATISTICS_PERCENTILES
            .iter()
            .map(|&percentile| {
                let q = f64::from(percentile) / 100.0;
                DeviationStatistics {
                    percentile,
                    before: before.ppf(q),
                    after: after.ppf(q),
                }
            })
            .collect()
    }
}

/// Absolute deviation at a percentile, see [TransformationDescription::statistics]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DeviationStatistics {
    pub percentile: u8,
    pub before: f64,
    pub after: f64,
}

fn resampled_inverse(model: &TransformationModel) -> Result<TransformationModel, AlignmentError> {
    let model_type = model.model_type();
    let (min, max) = model.domain().ok_or_else(|| {
        AlignmentError::unable_to_fit(model_type.name(), "model has no fitted domain to invert")
    })?;
    if !(max > min) {
        return Err(AlignmentError::unable_to_fit(
            model_type.name(),
            format!("cannot invert on zero-width domain [{min}, {max}]"),
        ));
    }
    let step = (max - min) / (INVERSION_GRID_SIZE - 1) as f64;
    let samples: DataPoints = (0..INVERSION_GRID_SIZE)
        .map(|i| {
            let x = if i == INVERSION_GRID_SIZE - 1 {
                max
            } else {
                min + i as f64 * step
            };
            DataPoint::new(model.evaluate(x), x)
        })
        .collect();
    let params = swap_weighting_params(&model.parameters());
    log::debug!(
        "inverting {model_type} model by resampling {INVERSION_GRID_SIZE} points on [{min}, {max}]"
    );
    TransformationModel::fit(model_type, &samples, &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::ParamValue;

    use approx::assert_relative_eq;

    fn linear_data() -> DataPoints {
        vec![
            DataPoint::new(0.0, 4.0),
            DataPoint::new(1.0, 6.0),
            DataPoint::new(2.0, 8.0),
            DataPoint::new(3.0, 10.0),
        ]
    }

    fn curved_data() -> DataPoints {
        (0..50)
            .map(|i| {
                let x = 100.0 + 20.0 * i as f64;
                DataPoint::new(x, 1.1 * x + 30.0 * (x / 300.0).sin() + 15.0)
            })
            .collect()
    }

    #[test]
    fn linear_fit_and_apply() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("linear", &Params::new()).unwrap();
        assert_eq!(trafo.model_type(), "linear");
        let params = trafo.model_params();
        let slope = params.get("slope").and_then(ParamValue::as_f64).unwrap();
        let intercept = params.get("intercept").and_then(ParamValue::as_f64).unwrap();
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 4.0, epsilon = 1e-12);
        assert_relative_eq!(trafo.apply(10.0), 24.0, epsilon = 1e-10);
    }

    #[test]
    fn apply_without_model_is_identity() {
        let trafo = TransformationDescription::from_data_points(linear_data());
        assert_eq!(trafo.model_type(), NO_MODEL);
        for &x in &[-1.0, 0.0, 3.5, 1e6] {
            assert_eq!(trafo.apply(x), x);
        }
    }

    #[test]
    fn set_data_points_clears_model() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("linear", &Params::new()).unwrap();
        trafo.set_data_points(vec![DataPoint::new(1.0, 1.0)]);
        assert_eq!(trafo.model_type(), NO_MODEL);
        assert!(trafo.model().is_none());
        assert_eq!(trafo.apply(7.0), 7.0);
        assert_eq!(trafo.data_points().len(), 1);
    }

    #[test]
    fn unknown_model_type() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        assert!(matches!(
            trafo.fit_model("quadratic", &Params::new()),
            Err(AlignmentError::InvalidValue { .. })
        ));
        assert_eq!(trafo.model_type(), NO_MODEL);
    }

    #[test]
    fn failed_fit_keeps_previous_model() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("linear", &Params::new()).unwrap();
        let before = trafo.clone();
        assert!(
            trafo
                .fit_model("b_spline", &Params::new().with("num_nodes", 0))
                .is_err()
        );
        assert_eq!(trafo, before);
    }

    #[test]
    fn fit_none_removes_model() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("linear", &Params::new()).unwrap();
        trafo.fit_model(NO_MODEL, &Params::new()).unwrap();
        assert!(trafo.model().is_none());
        assert_eq!(trafo.apply(1.0), 1.0);
    }

    #[test]
    fn identity_model() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("identity", &Params::new()).unwrap();
        assert_eq!(trafo.model_type(), "identity");
        assert_eq!(trafo.apply(2.5), 2.5);
        trafo.invert().unwrap();
        assert_eq!(trafo.apply(2.5), 2.5);
        assert_eq!(trafo.data_points()[0], DataPoint::new(4.0, 0.0));
    }

    #[test]
    fn invert_linear_twice() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.fit_model("linear", &Params::new()).unwrap();
        let forward = trafo.clone();
        trafo.invert().unwrap();
        assert_relative_eq!(trafo.apply(24.0), 10.0, epsilon = 1e-10);
        assert_eq!(trafo.data_points()[1], DataPoint::new(6.0, 1.0));
        trafo.invert().unwrap();
        for &x in &[-3.0, 0.0, 17.0] {
            assert_relative_eq!(trafo.apply(x), forward.apply(x), epsilon = 1e-10);
        }
        assert_eq!(trafo.data_points(), forward.data_points());
    }

    #[test]
    fn invert_without_model_swaps_data() {
        let mut trafo = TransformationDescription::from_data_points(linear_data());
        trafo.invert().unwrap();
        assert_eq!(trafo.model_type(), NO_MODEL);
        assert_eq!(trafo.data_points()[0], DataPoint::new(4.0, 0.0));
    }

    #[test]
    fn invert_resampled_models() {
        for (model_type, params) in [
            ("interpolated", Params::new()),
            ("interpolated", Params::new().with("interpolation_type", "akima")),
            ("b_spline", Params::new().with("num_nodes", 8)),
            ("lowess", Params::new().with("span", 0.1)),
        ] {
            let mut trafo = TransformationDescription::from_data_points(curved_data());
            trafo.fit_model(model_type, &params).unwrap();
            let forward = trafo.clone();
            trafo.invert().unwrap();
            assert_eq!(trafo.model_type(), model_type);
            for &x in &[150.0, 480.0, 777.0, 1020.0] {
                assert_relative_eq!(trafo.apply(forward.apply(x)), x, epsilon = 0.5);
            }
            trafo.invert().unwrap();
            for &x in &[150.0, 480.0, 777.0, 1020.0] {
                assert_relative_eq!(trafo.apply(x), forward.apply(x), epsilon = 0.5);
            }
        }
    }

    #[test]
    fn invert_keeps_weighting_consistent() {
        let mut trafo = TransformationDescription::from_data_points(curved_data());
        let params = Params::new().with("x_weight", "ln(x)").with("num_nodes", 20);
        trafo.fit_model("b_spline", &params).unwrap();
        let forward = trafo.clone();
        trafo.invert().unwrap();
        let inverse_params = trafo.model_params();
        assert_eq!(
            inverse_params.get("y_weight"),
            Some(&ParamValue::from("ln(y)"))
        );
        for &x in &[200.0, 600.0, 1000.0] {
            assert_relative_eq!(trafo.apply(forward.apply(x)), x, max_relative = 1e-3);
        }
    }

    #[test]
    fn deviations_and_statistics() {
        let data = vec![
            DataPoint::new(0.0, 1.0),
            DataPoint::new(1.0, 2.5),
            DataPoint::new(2.0, 2.0),
            DataPoint::new(3.0, 5.0),
        ];
        let mut trafo = TransformationDescription::from_data_points(data);
        assert_eq!(trafo.deviations(false, false), [1.0, 1.5, 0.0, 2.0]);
        assert_eq!(trafo.deviations(false, true), [0.0, 1.0, 1.5, 2.0]);

        trafo.fit_model("linear", &Params::new()).unwrap();
        let after = trafo.deviations(true, false);
        assert_relative_eq!(after.iter().sum::<f64>(), 0.0, epsilon = 1e-12);

        let statistics = trafo.statistics();
        assert_eq!(
            statistics.iter().map(|s| s.percentile).collect::<Vec<_>>(),
            STATISTICS_PERCENTILES
        );
        assert_eq!(statistics[0].before, 2.0);
        // R-5 median of [0, 1, 1.5, 2]
        assert_relative_eq!(statistics[5].before, 1.25);
        assert_relative_eq!(statistics[0].after, 1.2, epsilon = 1e-12);
        assert!(TransformationDescription::new().statistics().is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let mut trafo = TransformationDescription::from_data_points(curved_data());
        trafo.fit_model("interpolated", &Params::new()).unwrap();
        let json = serde_json::to_string(&trafo).unwrap();
        let back: TransformationDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trafo);
    }

    #[test]
    fn deserialize_rejects_inconsistent_model_type() {
        let linear = serde_json::to_value(
            TransformationModel::fit(ModelType::Linear, &linear_data(), &Params::new()).unwrap(),
        )
        .unwrap();
        for json in [
            serde_json::json!({"model_type": "linear", "data": [], "model": null}),
            serde_json::json!({"model_type": "none", "data": [], "model": linear}),
            serde_json::json!({"model_type": "b_spline", "data": [], "model": linear}),
        ] {
            assert!(
                serde_json::from_value::<TransformationDescription>(json.clone()).is_err(),
                "{json} is accepted"
            );
        }

        let custom = serde_json::json!({"model_type": "shift", "data": [], "model": linear});
        let trafo: TransformationDescription = serde_json::from_value(custom).unwrap();
        assert_eq!(trafo.model_type(), "shift");
        assert_relative_eq!(trafo.apply(10.0), 24.0, epsilon = 1e-10);
        let none: TransformationDescription =
            serde_json::from_str(r#"{"model_type": "none", "data": [], "model": null}"#).unwrap();
        assert_eq!(none, TransformationDescription::new());
    }
}

use crate::model::transformation_model::*;
use crate::straight_line_fit::fit_straight_line;

macro_const! {
    const DOC: &str = r#"
Linear transformation, `f(x) = slope * x + intercept`

Least-squares fit to the (optionally weighted) data points. With `symmetric_regression` the
regression is performed on `y - x` against `y + x`, so that the fit treats both coordinates
equally; the result is converted back to slope and intercept of `y` against `x`.

Parameters:
- `symmetric_regression`: boolean, default `false`
- `slope`, `intercept`: construct the model directly from empty data. With data points the
  regression result takes precedence and the given values are ignored, so that the parameters
  of a fitted model refit to the same model
- weighting keys, see [Weighting](crate::Weighting)

At least two points with distinct source coordinates are required.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LinearModel {
    slope: f64,
    intercept: f64,
    symmetric_regression: bool,
    weighting: Weighting,
    domain: Option<(f64, f64)>,
}

impl LinearModel {
    /// Unweighted line without data
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self {
            slope,
            intercept,
            symmetric_regression: false,
            weighting: Weighting::new(),
            domain: None,
        }
    }

    pub fn fit(data: &[DataPoint], params: &Params) -> Result<Self, AlignmentError> {
        let mut reader = params.reader();
        let weighting = Weighting::from_reader(&mut reader)?;
        let symmetric_regression = reader
            .take_bool("symmetric_regression")?
            .unwrap_or_else(Self::default_symmetric_regression);
        let slope = reader.take_f64("slope")?;
        let intercept = reader.take_f64("intercept")?;
        reader.finish()?;

        if data.is_empty() {
            return match (slope, intercept) {
                (Some(slope), Some(intercept)) => Ok(Self {
                    slope,
                    intercept,
                    symmetric_regression,
                    weighting,
                    domain: None,
                }),
                _ => Err(AlignmentError::unable_to_fit(
                    "linear",
                    "no data points and no slope and intercept given",
                )),
            };
        }

        if slope.is_some() || intercept.is_some() {
            log::debug!("linear fit: given slope and intercept are replaced by the regression");
        }

        let weighted = weighting.weight_data(data);
        let (slope, intercept) = if symmetric_regression {
            let u: Vec<_> = weighted.iter().map(|p| p.target - p.source).collect();
            let v: Vec<_> = weighted.iter().map(|p| p.target + p.source).collect();
            let line = fit_straight_line(&v[..], &u[..]).ok_or_else(|| {
                AlignmentError::unable_to_fit("linear", "degenerate symmetric regression")
            })?;
            let denominator = 1.0 - line.slope;
            if denominator == 0.0 {
                return Err(AlignmentError::unable_to_fit(
                    "linear",
                    "symmetric regression gives a vertical line",
                ));
            }
            (
                (1.0 + line.slope) / denominator,
                line.intercept / denominator,
            )
        } else {
            let x: Vec<_> = weighted.iter().map(|p| p.source).collect();
            let y: Vec<_> = weighted.iter().map(|p| p.target).collect();
            let line = fit_straight_line(&x[..], &y[..]).ok_or_else(|| {
                AlignmentError::unable_to_fit(
                    "linear",
                    "at least two points with distinct source coordinates are required",
                )
            })?;
            (line.slope, line.intercept)
        };
        if !(slope.is_finite() && intercept.is_finite()) {
            return Err(AlignmentError::unable_to_fit(
                "linear",
                "non-finite regression result",
            ));
        }
        log::debug!("linear fit: slope = {slope}, intercept = {intercept}");

        Ok(Self {
            slope,
            intercept,
            symmetric_regression,
            weighting,
            domain: source_range(data),
        })
    }

    #[inline]
    pub fn default_symmetric_regression() -> bool {
        false
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformationModelTrait for LinearModel {
    fn model_type(&self) -> ModelType {
        ModelType::Linear
    }

    fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    #[inline]
    fn evaluate_weighted(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    fn parameters(&self) -> Params {
        let mut params = Params::new()
            .with("slope", self.slope)
            .with("intercept", self.intercept)
            .with("symmetric_regression", self.symmetric_regression);
        self.weighting.write_params(&mut params);
        params
    }

    fn domain(&self) -> Option<(f64, f64)> {
        self.domain
    }

    fn closed_form_inverse(&self) -> Option<Result<TransformationModel, AlignmentError>> {
        if self.slope == 0.0 {
            return Some(Err(AlignmentError::unable_to_fit(
                "linear",
                "zero slope is not invertible",
            )));
        }
        let domain = self.domain.map(|(a, b)| {
            let (fa, fb) = (self.evaluate(a), self.evaluate(b));
            (fa.min(fb), fa.max(fb))
        });
        Some(Ok(Self {
            slope: self.slope.recip(),
            intercept: -self.intercept / self.slope,
            symmetric_regression: self.symmetric_regression,
            weighting: self.weighting.swapped(),
            domain,
        }
        .into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    use approx::assert_relative_eq;

    fn data(pairs: &[(f64, f64)]) -> Vec<DataPoint> {
        pairs.iter().copied().map(DataPoint::from).collect()
    }

    #[test]
    fn exact_fit() {
        let data = data(&[(0.0, 4.0), (1.0, 6.0), (2.0, 8.0), (3.0, 10.0)]);
        let model = LinearModel::fit(&data, &Params::new()).unwrap();
        assert_relative_eq!(model.slope(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(model.intercept(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(model.evaluate(10.0), 24.0, epsilon = 1e-10);
        assert_eq!(model.domain(), Some((0.0, 3.0)));
    }

    #[test]
    fn symmetric_regression_on_exact_line() {
        let data = data(&[(0.0, 4.0), (1.0, 6.0), (2.0, 8.0), (3.0, 10.0)]);
        let params = Params::new().with("symmetric_regression", true);
        let model = LinearModel::fit(&data, &params).unwrap();
        assert_relative_eq!(model.slope(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(model.intercept(), 4.0, epsilon = 1e-10);
    }

    #[test]
    fn symmetric_regression_lies_between_ordinary_fits() {
        let data = data(&[(0.0, 0.5), (1.0, 0.7), (2.0, 2.4), (3.0, 2.6), (4.0, 4.3)]);
        let forward = LinearModel::fit(&data, &Params::new()).unwrap();
        let swapped: Vec<_> = data.iter().map(DataPoint::swapped).collect();
        let backward = LinearModel::fit(&swapped, &Params::new()).unwrap();
        let symmetric =
            LinearModel::fit(&data, &Params::new().with("symmetric_regression", true)).unwrap();
        let (low, high) = (forward.slope(), backward.slope().recip());
        assert!(low < symmetric.slope() && symmetric.slope() < high);
    }

    #[test]
    fn weighted_fit() {
        // y = 3 x in log space is ln y = ln x + ln 3
        let data = data(&[(1.0, 3.0), (2.0, 6.0), (10.0, 30.0)]);
        let params = Params::new().with("x_weight", "ln(x)").with("y_weight", "ln(y)");
        let model = LinearModel::fit(&data, &params).unwrap();
        assert_relative_eq!(model.slope(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(model.intercept(), 3.0_f64.ln(), epsilon = 1e-10);
        assert_relative_eq!(model.evaluate(5.0), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn direct_construction_from_params() {
        let params = Params::new().with("slope", 0.5).with("intercept", -1.0);
        let model = LinearModel::fit(&[], &params).unwrap();
        assert_relative_eq!(model.evaluate(4.0), 1.0);
        assert_eq!(model.domain(), None);
        assert!(LinearModel::fit(&[], &Params::new()).is_err());
    }

    #[test]
    fn data_overrides_given_line() {
        let data = data(&[(0.0, 4.0), (1.0, 6.0), (2.0, 8.0), (3.0, 10.0)]);
        let params = Params::new().with("slope", -7.0).with("intercept", 100.0);
        let model = LinearModel::fit(&data, &params).unwrap();
        assert_relative_eq!(model.slope(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(model.intercept(), 4.0, epsilon = 1e-12);
        let only_slope = LinearModel::fit(&data, &Params::new().with("slope", 3.0)).unwrap();
        assert_eq!(only_slope, LinearModel::fit(&data, &Params::new()).unwrap());
    }

    #[test]
    fn too_few_points() {
        let result = LinearModel::fit(&data(&[(1.0, 2.0)]), &Params::new());
        assert!(matches!(result, Err(AlignmentError::UnableToFit { .. })));
        let result = LinearModel::fit(&data(&[(1.0, 2.0), (1.0, 3.0)]), &Params::new());
        assert!(matches!(result, Err(AlignmentError::UnableToFit { .. })));
    }

    #[test]
    fn closed_form_inverse() {
        let model = LinearModel::new(2.0, 4.0);
        let inverse = model.closed_form_inverse().unwrap().unwrap();
        assert_relative_eq!(inverse.evaluate(24.0), 10.0);
        assert!(
            LinearModel::new(0.0, 1.0)
                .closed_form_inverse()
                .unwrap()
                .is_err()
        );
    }

    #[test]
    fn inverse_swaps_weighting() {
        let data = data(&[(1.0, 3.0), (2.0, 6.0), (10.0, 30.0)]);
        let params = Params::new().with("x_weight", "ln(x)");
        let model = LinearModel::fit(&data, &params).unwrap();
        let inverse = model.closed_form_inverse().unwrap().unwrap();
        assert_eq!(inverse.weighting().y, model.weighting().x);
        for &x in &[1.5, 4.0, 8.0] {
            assert_relative_eq!(inverse.evaluate(model.evaluate(x)), x, max_relative = 1e-10);
        }
    }

    check_model!(LinearModel);
}

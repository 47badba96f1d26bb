use crate::model::transformation_model::*;
use crate::straight_line_fit::fit_straight_line;

use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

macro_const! {
    const DOC: &str = r#"
Interpolating transformation passing through every data point

Data points sharing a source coordinate are replaced by a single point with the mean target
coordinate. Between the points the model interpolates, outside of them it extrapolates linearly.

Parameters:
- `interpolation_type`: `linear`, `cspline` (natural cubic spline, default) or `akima`
- `extrapolation_type`:
  - `two-point-linear` (default): continue the first and the last segment
  - `end-to-end-linear`: line through the first and the last point on both sides
  - `global-linear`: least-squares line through all points on both sides
- weighting keys, see [Weighting](crate::Weighting)

At least two distinct source coordinates are required.
"#;
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationType {
    Linear,
    #[default]
    Cspline,
    Akima,
}

impl InterpolationType {
    pub const ALL: [Self; 3] = [Self::Linear, Self::Cspline, Self::Akima];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Cspline => "cspline",
            Self::Akima => "akima",
        }
    }
}

impl fmt::Display for InterpolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationType {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                AlignmentError::invalid_choice("interpolation_type", s, Self::ALL.map(Self::name))
            })
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ExtrapolationType {
    #[default]
    TwoPointLinear,
    EndToEndLinear,
    GlobalLinear,
}

impl ExtrapolationType {
    pub const ALL: [Self; 3] = [
        Self::TwoPointLinear,
        Self::EndToEndLinear,
        Self::GlobalLinear,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::TwoPointLinear => "two-point-linear",
            Self::EndToEndLinear => "end-to-end-linear",
            Self::GlobalLinear => "global-linear",
        }
    }
}

impl fmt::Display for ExtrapolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtrapolationType {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                AlignmentError::invalid_choice("extrapolation_type", s, Self::ALL.map(Self::name))
            })
    }
}

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct InterpolatedModel {
    interpolation_type: InterpolationType,
    extrapolation_type: ExtrapolationType,
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives for `cspline`, node slopes for `akima`, empty for `linear`
    coefficients: Vec<f64>,
    left: Line,
    right: Line,
    weighting: Weighting,
    domain: Option<(f64, f64)>,
}

impl InterpolatedModel {
    pub fn fit(data: &[DataPoint], params: &Params) -> Result<Self, AlignmentError> {
        let mut reader = params.reader();
        let weighting = Weighting::from_reader(&mut reader)?;
        let interpolation_type = match reader.take_text("interpolation_type")? {
            Some(s) => s.parse()?,
            None => InterpolationType::default(),
        };
        let extrapolation_type = match reader.take_text("extrapolation_type")? {
            Some(s) => s.parse()?,
            None => ExtrapolationType::default(),
        };
        reader.finish()?;

        let pairs = sorted_weighted_pairs("interpolated", data, &weighting)?;
        let mut model = Self::from_sorted_pairs(
            &pairs,
            interpolation_type,
            extrapolation_type,
            weighting,
        )?;
        model.domain = source_range(data);
        Ok(model)
    }

    /// Build from `(x, y)` pairs in weighted coordinates sorted by `x`
    pub(super) fn from_sorted_pairs(
        pairs: &[(f64, f64)],
        interpolation_type: InterpolationType,
        extrapolation_type: ExtrapolationType,
        weighting: Weighting,
    ) -> Result<Self, AlignmentError> {
        let (x, y): (Vec<_>, Vec<_>) = pairs
            .iter()
            .chunk_by(|(x, _)| *x)
            .into_iter()
            .map(|(x, group)| {
                let (count, sum) = group.fold((0usize, 0.0), |(n, s), &(_, y)| (n + 1, s + y));
                (x, sum / count as f64)
            })
            .unzip();
        if x.len() < pairs.len() {
            log::warn!(
                "averaged {} data points with duplicate source coordinates",
                pairs.len() - x.len()
            );
        }
        if x.len() < 2 {
            return Err(AlignmentError::unable_to_fit(
                "interpolated",
                "at least two distinct source coordinates are required",
            ));
        }

        let coefficients = match interpolation_type {
            InterpolationType::Linear => vec![],
            InterpolationType::Cspline => natural_spline_second_derivatives(&x, &y),
            InterpolationType::Akima => akima_slopes(&x, &y),
        };

        let n = x.len();
        let (left, right) = match extrapolation_type {
            ExtrapolationType::TwoPointLinear => (
                Line::through(x[0], y[0], secant(&x, &y, 0)),
                Line::through(x[n - 1], y[n - 1], secant(&x, &y, n - 2)),
            ),
            ExtrapolationType::EndToEndLinear => {
                let slope = (y[n - 1] - y[0]) / (x[n - 1] - x[0]);
                let line = Line::through(x[0], y[0], slope);
                (line, line)
            }
            ExtrapolationType::GlobalLinear => {
                let fit = fit_straight_line(&x[..], &y[..]).ok_or_else(|| {
                    AlignmentError::unable_to_fit("interpolated", "degenerate global linear fit")
                })?;
                let line = Line {
                    slope: fit.slope,
                    intercept: fit.intercept,
                };
                (line, line)
            }
        };

        Ok(Self {
            interpolation_type,
            extrapolation_type,
            x,
            y,
            coefficients,
            left,
            right,
            weighting,
            domain: None,
        })
    }

    pub fn interpolation_type(&self) -> InterpolationType {
        self.interpolation_type
    }

    pub fn extrapolation_type(&self) -> ExtrapolationType {
        self.extrapolation_type
    }

    /// Interpolation nodes in weighted coordinates
    pub fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub(super) fn write_interpolation_params(&self, params: &mut Params) {
        params.insert("interpolation_type", self.interpolation_type.name());
        params.insert("extrapolation_type", self.extrapolation_type.name());
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    fn interpolate(&self, i: usize, x: f64) -> f64 {
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        match self.interpolation_type {
            InterpolationType::Linear => {
                let w = (x - x0) / (x1 - x0);
                (1.0 - w) * y0 + w * y1
            }
            InterpolationType::Cspline => {
                let h = x1 - x0;
                let a = (x1 - x) / h;
                let b = (x - x0) / h;
                a * y0
                    + b * y1
                    + ((a.powi(3) - a) * self.coefficients[i]
                        + (b.powi(3) - b) * self.coefficients[i + 1])
                        * h
                        * h
                        / 6.0
            }
            InterpolationType::Akima => hermite(
                x0,
                x1,
                y0,
                y1,
                self.coefficients[i],
                self.coefficients[i + 1],
                x,
            ),
        }
    }
}

impl TransformationModelTrait for InterpolatedModel {
    fn model_type(&self) -> ModelType {
        ModelType::Interpolated
    }

    fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    fn evaluate_weighted(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x < self.x[0] {
            return self.left.eval(x);
        }
        if x > self.x[n - 1] {
            return self.right.eval(x);
        }
        let i = self.x.partition_point(|&v| v <= x).clamp(1, n - 1) - 1;
        self.interpolate(i, x)
    }

    fn parameters(&self) -> Params {
        let mut params = Params::new();
        self.write_interpolation_params(&mut params);
        self.weighting.write_params(&mut params);
        params
    }

    fn domain(&self) -> Option<(f64, f64)> {
        self.domain
    }

    fn closed_form_inverse(&self) -> Option<Result<TransformationModel, AlignmentError>> {
        None
    }
}

fn secant(x: &[f64], y: &[f64], i: usize) -> f64 {
    (y[i + 1] - y[i]) / (x[i + 1] - x[i])
}

/// Natural boundary conditions: zero second derivative at both ends
fn natural_spline_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let d = secant(x, y, i) - secant(x, y, i - 1);
        u[i] = (6.0 * d / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

fn akima_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 2 {
        let m = secant(x, y, 0);
        return vec![m, m];
    }
    // Secants padded with two extrapolated values on each side
    let mut m = Vec::with_capacity(n + 3);
    let inner: Vec<_> = (0..n - 1).map(|i| secant(x, y, i)).collect();
    m.push(3.0 * inner[0] - 2.0 * inner[1]);
    m.push(2.0 * inner[0] - inner[1]);
    m.extend_from_slice(&inner);
    m.push(2.0 * inner[n - 2] - inner[n - 3]);
    m.push(3.0 * inner[n - 2] - 2.0 * inner[n - 3]);

    (0..n)
        .map(|i| {
            let w1 = (m[i + 3] - m[i + 2]).abs();
            let w2 = (m[i + 1] - m[i]).abs();
            if w1 + w2 == 0.0 {
                0.5 * (m[i + 1] + m[i + 2])
            } else {
                (w1 * m[i + 1] + w2 * m[i + 2]) / (w1 + w2)
            }
        })
        .collect()
}

#[inline]
fn hermite(x0: f64, x1: f64, y0: f64, y1: f64, m0: f64, m1: f64, x: f64) -> f64 {
    let h = x1 - x0;
    let s = (x - x0) / h;
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * y0
        + (s3 - 2.0 * s2 + s) * h * m0
        + (-2.0 * s3 + 3.0 * s2) * y1
        + (s3 - s2) * h * m1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    use approx::assert_relative_eq;

    fn data(pairs: &[(f64, f64)]) -> Vec<DataPoint> {
        pairs.iter().copied().map(DataPoint::from).collect()
    }

    fn params(interpolation: &str, extrapolation: &str) -> Params {
        Params::new()
            .with("interpolation_type", interpolation)
            .with("extrapolation_type", extrapolation)
    }

    #[test]
    fn passes_through_points() {
        let data = data(&[(0.0, 1.0), (1.0, 3.0), (2.5, 2.0), (4.0, 6.0), (5.0, 5.5)]);
        for interpolation in InterpolationType::ALL {
            let params = params(interpolation.name(), "two-point-linear");
            let model = InterpolatedModel::fit(&data, &params).unwrap();
            for p in &data {
                assert_relative_eq!(model.evaluate(p.source), p.target, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn linear_interpolation_between_points() {
        let data = data(&[(0.0, 0.0), (2.0, 4.0), (4.0, 4.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "two-point-linear")).unwrap();
        assert_relative_eq!(model.evaluate(1.0), 2.0);
        assert_relative_eq!(model.evaluate(3.0), 4.0);
    }

    #[test]
    fn cspline_reproduces_line() {
        let data = data(&[(0.0, 1.0), (1.0, 3.0), (3.0, 7.0), (4.0, 9.0)]);
        let model = InterpolatedModel::fit(&data, &Params::new()).unwrap();
        for &x in &[0.5, 2.0, 3.7] {
            assert_relative_eq!(model.evaluate(x), 2.0 * x + 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn akima_reproduces_line() {
        let data = data(&[(0.0, 1.0), (1.0, 3.0), (3.0, 7.0), (4.0, 9.0), (6.0, 13.0)]);
        let model = InterpolatedModel::fit(&data, &params("akima", "two-point-linear")).unwrap();
        for &x in &[0.5, 2.0, 5.1] {
            assert_relative_eq!(model.evaluate(x), 2.0 * x + 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn two_point_linear_extrapolation() {
        let data = data(&[(0.0, 0.0), (1.0, 2.0), (2.0, 3.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "two-point-linear")).unwrap();
        assert_relative_eq!(model.evaluate(-1.0), -2.0);
        assert_relative_eq!(model.evaluate(4.0), 5.0);
    }

    #[test]
    fn end_to_end_linear_extrapolation() {
        let data = data(&[(0.0, 0.0), (1.0, 2.0), (2.0, 3.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "end-to-end-linear")).unwrap();
        assert_relative_eq!(model.evaluate(-2.0), -3.0);
        assert_relative_eq!(model.evaluate(4.0), 6.0);
    }

    #[test]
    fn global_linear_extrapolation() {
        let data = data(&[(0.0, 0.0), (1.0, 2.0), (2.0, 3.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "global-linear")).unwrap();
        // least squares: slope 1.5, intercept 1/6
        assert_relative_eq!(model.evaluate(4.0), 6.0 + 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(model.evaluate(-2.0), -3.0 + 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn duplicates_are_averaged() {
        let data = data(&[(0.0, 0.0), (1.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "two-point-linear")).unwrap();
        assert_relative_eq!(model.evaluate(1.0), 2.0);
        assert_eq!(model.nodes().count(), 3);
    }

    #[test]
    fn unsorted_input() {
        let data = data(&[(2.0, 4.0), (0.0, 0.0), (1.0, 2.0)]);
        let model = InterpolatedModel::fit(&data, &params("linear", "two-point-linear")).unwrap();
        assert_relative_eq!(model.evaluate(1.5), 3.0);
    }

    #[test]
    fn too_few_distinct_points() {
        let data = data(&[(1.0, 1.0), (1.0, 2.0)]);
        assert!(matches!(
            InterpolatedModel::fit(&data, &Params::new()),
            Err(AlignmentError::UnableToFit { .. })
        ));
    }

    #[test]
    fn invalid_types() {
        let data = data(&[(0.0, 0.0), (1.0, 1.0)]);
        for params in [params("quadratic", "two-point-linear"), params("linear", "flat")] {
            assert!(matches!(
                InterpolatedModel::fit(&data, &params),
                Err(AlignmentError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn parameters_round_trip() {
        let data = data(&[(0.0, 0.0), (1.0, 2.0), (2.0, 3.0)]);
        let model = InterpolatedModel::fit(&data, &params("akima", "global-linear")).unwrap();
        let refit = InterpolatedModel::fit(&data, &model.parameters()).unwrap();
        assert_eq!(refit, model);
    }

    check_model!(InterpolatedModel);
}

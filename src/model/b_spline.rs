use crate::model::transformation_model::*;
use crate::straight_line_fit::fit_straight_line;

use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::str::FromStr;

const DEGREE: usize = 3;

macro_const! {
    const DOC: &str = r#"
Smoothing cubic B-spline transformation

The spline is defined on a clamped knot vector with `num_nodes` equally spaced breakpoints
spanning the source range of the data, which gives `num_nodes + 2` basis functions. The
coefficients minimize the sum of squared residuals plus a roughness penalty on second
divided differences of neighbouring coefficients, taken at their Greville abscissae. The
penalty is scaled by the ratio of the traces of the data and the penalty normal matrices, so
`smoothing` does not depend on the number of points. Larger `smoothing` gives a stiffer
curve, a very large value approaches a straight line.

Parameters:
- `num_nodes`: integer, at least 2, default 5
- `smoothing`: non-negative number, default 0.001
- `extrapolate`: behaviour outside of the data range
  - `linear` (default): continue with the slope of the spline at the boundary
  - `b_spline`: continue the boundary polynomial pieces
  - `constant`: keep the boundary value
  - `global_linear`: least-squares line through all data points
- weighting keys, see [Weighting](crate::Weighting)

Fitting fails when the data has fewer than two distinct source coordinates, or, without
smoothing, fewer distinct source coordinates than basis functions.
"#;
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BSplineExtrapolation {
    #[default]
    Linear,
    BSpline,
    Constant,
    GlobalLinear,
}

impl BSplineExtrapolation {
    pub const ALL: [Self; 4] = [
        Self::Linear,
        Self::BSpline,
        Self::Constant,
        Self::GlobalLinear,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::BSpline => "b_spline",
            Self::Constant => "constant",
            Self::GlobalLinear => "global_linear",
        }
    }
}

impl fmt::Display for BSplineExtrapolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BSplineExtrapolation {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                AlignmentError::invalid_choice("extrapolate", s, Self::ALL.map(Self::name))
            })
    }
}

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BSplineModel {
    num_nodes: usize,
    smoothing: f64,
    extrapolate: BSplineExtrapolation,
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    left: Line,
    right: Line,
    weighting: Weighting,
    domain: Option<(f64, f64)>,
}

impl BSplineModel {
    pub fn fit(data: &[DataPoint], params: &Params) -> Result<Self, AlignmentError> {
        let mut reader = params.reader();
        let weighting = Weighting::from_reader(&mut reader)?;
        let num_nodes = reader
            .take_usize("num_nodes")?
            .unwrap_or_else(Self::default_num_nodes);
        if num_nodes < 2 {
            return Err(AlignmentError::invalid_value("num_nodes", num_nodes));
        }
        let smoothing = reader
            .take_f64("smoothing")?
            .unwrap_or_else(Self::default_smoothing);
        if !(smoothing >= 0.0 && smoothing.is_finite()) {
            return Err(AlignmentError::invalid_value("smoothing", smoothing));
        }
        let extrapolate = match reader.take_text("extrapolate")? {
            Some(s) => s.parse()?,
            None => BSplineExtrapolation::default(),
        };
        reader.finish()?;

        let pairs = sorted_weighted_pairs("b_spline", data, &weighting)?;
        let (x_min, x_max) = match (pairs.first(), pairs.last()) {
            (Some(&(first, _)), Some(&(last, _))) => (first, last),
            _ => return Err(AlignmentError::unable_to_fit("b_spline", "no data points")),
        };
        let tolerance = 1e-12 * x_min.abs().max(x_max.abs()).max(1.0);
        let distinct = 1 + pairs
            .windows(2)
            .filter(|w| w[1].0 - w[0].0 > tolerance)
            .count();
        if distinct < 2 {
            return Err(AlignmentError::unable_to_fit(
                "b_spline",
                "at least two distinct source coordinates are required",
            ));
        }
        let num_basis = num_nodes + 2;
        if smoothing == 0.0 && distinct < num_basis {
            return Err(AlignmentError::unable_to_fit(
                "b_spline",
                format!(
                    "{distinct} distinct source coordinates are not enough for {num_basis} basis functions without smoothing"
                ),
            ));
        }

        let knots = clamped_uniform_knots(x_min, x_max, num_nodes);
        let coefficients = penalized_least_squares(&knots, &pairs, smoothing)?;
        log::debug!(
            "b_spline fit: {num_nodes} nodes, smoothing {smoothing}, {} points",
            pairs.len()
        );

        let mut model = Self {
            num_nodes,
            smoothing,
            extrapolate,
            knots,
            coefficients,
            left: Line::through(0.0, 0.0, 0.0),
            right: Line::through(0.0, 0.0, 0.0),
            weighting,
            domain: source_range(data),
        };
        (model.left, model.right) = model.boundary_lines(x_min, x_max, &pairs)?;
        Ok(model)
    }

    #[inline]
    pub fn default_num_nodes() -> usize {
        5
    }

    #[inline]
    pub fn default_smoothing() -> f64 {
        1e-3
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn extrapolate(&self) -> BSplineExtrapolation {
        self.extrapolate
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    fn x_min(&self) -> f64 {
        self.knots[0]
    }

    fn x_max(&self) -> f64 {
        self.knots[self.knots.len() - 1]
    }

    fn spline(&self, x: f64) -> f64 {
        let (span, basis) = basis_functions(&self.knots, DEGREE, x);
        basis
            .iter()
            .enumerate()
            .map(|(j, b)| b * self.coefficients[span - DEGREE + j])
            .sum()
    }

    fn spline_derivative(&self, x: f64) -> f64 {
        let derivative_coefficients: Vec<_> = (0..self.coefficients.len() - 1)
            .map(|i| {
                let h = self.knots[i + DEGREE + 1] - self.knots[i + 1];
                if h > 0.0 {
                    DEGREE as f64 * (self.coefficients[i + 1] - self.coefficients[i]) / h
                } else {
                    0.0
                }
            })
            .collect();
        let knots = &self.knots[1..self.knots.len() - 1];
        let (span, basis) = basis_functions(knots, DEGREE - 1, x);
        basis
            .iter()
            .enumerate()
            .map(|(j, b)| b * derivative_coefficients[span - (DEGREE - 1) + j])
            .sum()
    }

    fn boundary_lines(
        &self,
        x_min: f64,
        x_max: f64,
        pairs: &[(f64, f64)],
    ) -> Result<(Line, Line), AlignmentError> {
        Ok(match self.extrapolate {
            // Evaluated through the spline itself, lines are unused
            BSplineExtrapolation::BSpline => {
                (Line::through(0.0, 0.0, 0.0), Line::through(0.0, 0.0, 0.0))
            }
            BSplineExtrapolation::Linear => (
                Line::through(x_min, self.spline(x_min), self.spline_derivative(x_min)),
                Line::through(x_max, self.spline(x_max), self.spline_derivative(x_max)),
            ),
            BSplineExtrapolation::Constant => (
                Line::through(x_min, self.spline(x_min), 0.0),
                Line::through(x_max, self.spline(x_max), 0.0),
            ),
            BSplineExtrapolation::GlobalLinear => {
                let (x, y): (Vec<_>, Vec<_>) = pairs.iter().copied().unzip();
                let fit = fit_straight_line(&x[..], &y[..]).ok_or_else(|| {
                    AlignmentError::unable_to_fit("b_spline", "degenerate global linear fit")
                })?;
                let line = Line {
                    slope: fit.slope,
                    intercept: fit.intercept,
                };
                (line, line)
            }
        })
    }
}

impl TransformationModelTrait for BSplineModel {
    fn model_type(&self) -> ModelType {
        ModelType::BSpline
    }

    fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    fn evaluate_weighted(&self, x: f64) -> f64 {
        if self.extrapolate == BSplineExtrapolation::BSpline {
            return self.spline(x);
        }
        if x < self.x_min() {
            self.left.eval(x)
        } else if x > self.x_max() {
            self.right.eval(x)
        } else {
            self.spline(x)
        }
    }

    fn parameters(&self) -> Params {
        let mut params = Params::new()
            .with("num_nodes", self.num_nodes)
            .with("smoothing", self.smoothing)
            .with("extrapolate", self.extrapolate.name());
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

/// Boundary knots repeated `DEGREE + 1` times, `num_nodes` equally spaced breakpoints
fn clamped_uniform_knots(x_min: f64, x_max: f64, num_nodes: usize) -> Vec<f64> {
    let intervals = num_nodes - 1;
    let step = (x_max - x_min) / intervals as f64;
    std::iter::repeat_n(x_min, DEGREE)
        .chain((0..intervals).map(|j| x_min + j as f64 * step))
        .chain(std::iter::repeat_n(x_max, DEGREE + 1))
        .collect()
}

/// Index of the knot span containing `x` and the `degree + 1` non-zero basis functions there
///
/// Outside of the knot range the boundary span is used, which continues its polynomial piece.
fn basis_functions(knots: &[f64], degree: usize, x: f64) -> (usize, Vec<f64>) {
    let n = knots.len() - degree - 2;
    let span = if x >= knots[n + 1] {
        n
    } else if x <= knots[degree] {
        degree
    } else {
        knots.partition_point(|&k| k <= x) - 1
    };

    let mut basis = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    basis[0] = 1.0;
    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = basis[r] / (right[r + 1] + left[j - r]);
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }
    (span, basis)
}

/// Solve `(BᵀB + λ s DᵀD) c = Bᵀy` with `D` the second difference operator on the coefficients
fn penalized_least_squares(
    knots: &[f64],
    pairs: &[(f64, f64)],
    smoothing: f64,
) -> Result<Vec<f64>, AlignmentError> {
    let num_basis = knots.len() - DEGREE - 1;
    let mut normal = DMatrix::<f64>::zeros(num_basis, num_basis);
    let mut rhs = DVector::<f64>::zeros(num_basis);
    for &(x, y) in pairs {
        let (span, basis) = basis_functions(knots, DEGREE, x);
        let offset = span - DEGREE;
        for (a, &ba) in basis.iter().enumerate() {
            rhs[offset + a] += ba * y;
            for (b, &bb) in basis.iter().enumerate() {
                normal[(offset + a, offset + b)] += ba * bb;
            }
        }
    }

    // Second divided differences over the Greville abscissae vanish for straight lines
    let greville: Vec<f64> = (0..num_basis)
        .map(|i| knots[i + 1..=i + DEGREE].iter().sum::<f64>() / DEGREE as f64)
        .collect();
    let mut penalty = DMatrix::<f64>::zeros(num_basis, num_basis);
    for row in 0..num_basis - 2 {
        let (g0, g1, g2) = (greville[row], greville[row + 1], greville[row + 2]);
        let stencil = [
            1.0 / ((g1 - g0) * (g2 - g0)),
            -1.0 / ((g1 - g0) * (g2 - g1)),
            1.0 / ((g2 - g1) * (g2 - g0)),
        ];
        for (a, &da) in stencil.iter().enumerate() {
            for (b, &db) in stencil.iter().enumerate() {
                penalty[(row + a, row + b)] += da * db;
            }
        }
    }
    let scale = normal.trace() / penalty.trace();
    let system = normal + penalty * (smoothing * scale);

    let cholesky = system.cholesky().ok_or_else(|| {
        AlignmentError::unable_to_fit("b_spline", "normal equations are not positive definite")
    })?;
    let coefficients = cholesky.solve(&rhs);
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(AlignmentError::unable_to_fit(
            "b_spline",
            "non-finite spline coefficients",
        ));
    }
    Ok(coefficients.iter().copied().collect())
}

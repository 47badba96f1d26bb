use crate::data::SortedArray;
use crate::model::interpolated::{ExtrapolationType, InterpolatedModel, InterpolationType};
use crate::model::transformation_model::*;

macro_const! {
    const DOC: &str = r#"
LOWESS transformation: locally weighted scatterplot smoothing followed by interpolation

At every data point a straight line is fitted to the nearest `span` fraction of the data,
weighted by the tricube kernel of the distance. Then `num_iterations` robustness iterations
down-weight points by the bisquare function of their residual, scaled by six median absolute
residuals. The smoothed points are interpolated like the `interpolated` model does.

Parameters:
- `span`: fraction of points in every local fit, `0 < span <= 1`, default 2/3
- `num_iterations`: number of robustness iterations, default 3
- `interpolation_type`, `extrapolation_type`: see the `interpolated` model
- weighting keys, see [Weighting](crate::Weighting)
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LowessModel {
    span: f64,
    num_iterations: usize,
    /// Interpolates the smoothed points, operates in weighted coordinates without own weighting
    smoothed: InterpolatedModel,
    weighting: Weighting,
    domain: Option<(f64, f64)>,
}

impl LowessModel {
    pub fn fit(data: &[DataPoint], params: &Params) -> Result<Self, AlignmentError> {
        let mut reader = params.reader();
        let weighting = Weighting::from_reader(&mut reader)?;
        let span = reader.take_f64("span")?.unwrap_or_else(Self::default_span);
        if !(span > 0.0 && span <= 1.0) {
            return Err(AlignmentError::invalid_value("span", span));
        }
        let num_iterations = reader
            .take_usize("num_iterations")?
            .unwrap_or_else(Self::default_num_iterations);
        let interpolation_type: InterpolationType = match reader.take_text("interpolation_type")? {
            Some(s) => s.parse()?,
            None => InterpolationType::default(),
        };
        let extrapolation_type: ExtrapolationType = match reader.take_text("extrapolation_type")? {
            Some(s) => s.parse()?,
            None => ExtrapolationType::default(),
        };
        reader.finish()?;

        let pairs = sorted_weighted_pairs("lowess", data, &weighting)?;
        let distinct = pairs.windows(2).filter(|w| w[1].0 > w[0].0).count() + 1;
        if pairs.is_empty() || distinct < 2 {
            return Err(AlignmentError::unable_to_fit(
                "lowess",
                "at least two distinct source coordinates are required",
            ));
        }
        let (x, y): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let fitted = lowess(&x, &y, span, num_iterations);
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err(AlignmentError::unable_to_fit("lowess", "non-finite smoothed values"));
        }
        log::debug!(
            "lowess fit: span {span}, {num_iterations} robustness iterations, {} points",
            x.len()
        );

        let smoothed_pairs: Vec<_> = x.into_iter().zip(fitted).collect();
        let smoothed = InterpolatedModel::from_sorted_pairs(
            &smoothed_pairs,
            interpolation_type,
            extrapolation_type,
            Weighting::new(),
        )?;
        Ok(Self {
            span,
            num_iterations,
            smoothed,
            weighting,
            domain: source_range(data),
        })
    }

    #[inline]
    pub fn default_span() -> f64 {
        2.0 / 3.0
    }

    #[inline]
    pub fn default_num_iterations() -> usize {
        3
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformationModelTrait for LowessModel {
    fn model_type(&self) -> ModelType {
        ModelType::Lowess
    }

    fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    fn evaluate_weighted(&self, x: f64) -> f64 {
        self.smoothed.evaluate_weighted(x)
    }

    fn parameters(&self) -> Params {
        let mut params = Params::new()
            .with("span", self.span)
            .with("num_iterations", self.num_iterations);
        self.smoothed.write_interpolation_params(&mut params);
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

#[inline]
fn tricube(u: f64) -> f64 {
    if u < 1.0 { (1.0 - u.powi(3)).powi(3) } else { 0.0 }
}

#[inline]
fn bisquare(u: f64) -> f64 {
    if u.abs() < 1.0 {
        (1.0 - u * u).powi(2)
    } else {
        0.0
    }
}

/// Smoothed value at every `x`, which must be sorted
fn lowess(x: &[f64], y: &[f64], span: f64, num_iterations: usize) -> Vec<f64> {
    let n = x.len();
    let window = ((span * n as f64).ceil() as usize).clamp(2.min(n), n);
    let mut robustness = vec![1.0; n];
    let mut fitted = vec![0.0; n];

    for iteration in 0..=num_iterations {
        let mut lo = 0;
        for i in 0..n {
            // Slide the window of nearest neighbours to the right while it gets narrower
            while lo + window < n && x[i] - x[lo] > x[lo + window] - x[i] {
                lo += 1;
            }
            let hi = lo + window;
            let radius = (x[i] - x[lo]).max(x[hi - 1] - x[i]) * (1.0 + 1e-10);
            fitted[i] = local_linear(&x[lo..hi], &y[lo..hi], &robustness[lo..hi], x[i], radius)
                .unwrap_or(y[i]);
        }

        if iteration == num_iterations {
            break;
        }
        let residuals: Vec<_> = y.iter().zip(&fitted).map(|(y, f)| y - f).collect();
        let scale = 6.0 * SortedArray::from_iter(residuals.iter().map(|r| r.abs())).median();
        // Residuals at rounding level, the fit is already exact
        let y_magnitude = y.iter().map(|v| v.abs()).sum::<f64>() / n as f64;
        if !(scale > 1e-10 * y_magnitude.max(f64::MIN_POSITIVE)) {
            break;
        }
        for (r, residual) in robustness.iter_mut().zip(&residuals) {
            *r = bisquare(residual / scale);
        }
    }
    fitted
}

/// Weighted least-squares line evaluated at `x0`, `None` if all weights vanish
fn local_linear(x: &[f64], y: &[f64], robustness: &[f64], x0: f64, radius: f64) -> Option<f64> {
    let weights: Vec<_> = x
        .iter()
        .zip(robustness)
        .map(|(&xj, &r)| {
            let kernel = if radius > 0.0 {
                tricube((xj - x0).abs() / radius)
            } else {
                1.0
            };
            kernel * r
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return None;
    }
    let x_mean = weights.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() / total;
    let y_mean = weights.iter().zip(y).map(|(w, y)| w * y).sum::<f64>() / total;
    let (sxx, sxy) = weights
        .iter()
        .zip(x.iter().zip(y))
        .fold((0.0, 0.0), |(sxx, sxy), (w, (x, y))| {
            let dx = x - x_mean;
            (sxx + w * dx * dx, sxy + w * dx * (y - y_mean))
        });
    if sxx > f64::EPSILON * radius * radius * total {
        Some(y_mean + sxy / sxx * (x0 - x_mean))
    } else {
        Some(y_mean)
    }
}

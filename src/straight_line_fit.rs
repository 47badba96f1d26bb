use ndarray::{ArrayView1, Zip};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StraightLineFitterResult {
    pub slope: f64,
    pub intercept: f64,
    /// Sum of squared residuals divided by the number of degrees of freedom, zero for two points
    pub reduced_chi2: f64,
}

/// Ordinary least-squares line `y = slope * x + intercept`
///
/// Returns `None` when fewer than two points are given or when all `x` are equal, i.e. when the
/// design matrix is singular.
pub fn fit_straight_line<'a>(
    x: impl Into<ArrayView1<'a, f64>>,
    y: impl Into<ArrayView1<'a, f64>>,
) -> Option<StraightLineFitterResult> {
    let (x, y) = (x.into(), y.into());
    assert_eq!(x.len(), y.len(), "x and y must have the same length");
    let n = x.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let x_mean = x.sum() / nf;
    let y_mean = y.sum() / nf;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    Zip::from(&x).and(&y).for_each(|&x, &y| {
        let dx = x - x_mean;
        sxx += dx * dx;
        sxy += dx * (y - y_mean);
    });
    // Relative to the spread of the data, so that large offsets do not hide a zero spread
    if !(sxx > f64::EPSILON * x.fold(0.0, |acc: f64, &x| acc + x * x)) {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let reduced_chi2 = if n > 2 {
        Zip::from(&x)
            .and(&y)
            .fold(0.0, |acc, &x, &y| acc + (y - slope * x - intercept).powi(2))
            / (nf - 2.0)
    } else {
        0.0
    };
    Some(StraightLineFitterResult {
        slope,
        intercept,
        reduced_chi2,
    })
}

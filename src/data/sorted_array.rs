use crate::error::SortedArrayError;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

// Underlying array is guaranteed to be sorted, contiguous and NaN-free
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SortedArray(pub Array1<f64>);

impl SortedArray {
    pub fn from_sorted(sorted_array: impl Into<Array1<f64>>) -> Result<Self, SortedArrayError> {
        let sorted_array = sorted_array.into();
        if sorted_array
            .as_slice()
            .ok_or(SortedArrayError::NonContiguous)?
            .is_sorted()
        {
            Ok(Self(sorted_array))
        } else {
            Err(SortedArrayError::Unsorted)
        }
    }

    pub fn maximum(&self) -> f64 {
        self[self.len() - 1]
    }

    pub fn minimum(&self) -> f64 {
        self[0]
    }

    pub fn median(&self) -> f64 {
        assert_ne!(self.len(), 0);
        let i = (self.len() - 1) / 2;
        if self.len() % 2 == 0 {
            0.5 * (self[i] + self[i + 1])
        } else {
            self[i]
        }
    }

    // R-5 from https://en.wikipedia.org/wiki/Quantile
    pub fn ppf(&self, q: f64) -> f64 {
        assert_ne!(self.len(), 0);
        assert!(
            (0.0..=1.0).contains(&q),
            "quantile should be between zero and unity"
        );
        let h = (self.len() as f64) * q - 0.5;
        let h_floor = h.floor();
        if h_floor < 0.0 {
            self.minimum()
        } else {
            #[allow(clippy::cast_sign_loss)]
            let i = h_floor as usize;
            if i >= self.len() - 1 {
                self.maximum()
            } else {
                self[i] + (h - h_floor) * (self[i + 1] - self[i])
            }
        }
    }
}

impl From<Vec<f64>> for SortedArray {
    fn from(mut v: Vec<f64>) -> Self {
        v.sort_unstable_by(f64::total_cmp);
        Self(Array1::from_vec(v))
    }
}

impl From<&[f64]> for SortedArray {
    fn from(s: &[f64]) -> Self {
        s.to_vec().into()
    }
}

impl FromIterator<f64> for SortedArray {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl Deref for SortedArray {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        // Constructors only produce standard-layout arrays
        self.0.as_slice().unwrap_or(&[])
    }
}

impl AsRef<[f64]> for SortedArray {
    fn as_ref(&self) -> &[f64] {
        self
    }
}

#[allow(clippy::float_cmp)]
#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use rand::prelude::*;

    fn random_sorted(rng: &mut StdRng, n: usize) -> SortedArray {
        (0..n).map(|_| rng.random::<f64>()).collect()
    }

    #[test]
    fn median_is_ppf_half() {
        let mut rng = StdRng::seed_from_u64(0);
        for i in 0..10 {
            let a = random_sorted(&mut rng, 100 + i);
            assert_eq!(a.median(), a.ppf(0.5));
        }
    }

    #[test]
    fn extremes_are_ppf_zero_and_unity() {
        let mut rng = StdRng::seed_from_u64(1);
        for i in 0..10 {
            let a = random_sorted(&mut rng, 50 + i);
            assert_eq!(a.minimum(), a.ppf(0.0));
            assert_eq!(a.maximum(), a.ppf(1.0));
        }
    }

    #[test]
    fn ppf_tenths() {
        let a = SortedArray::from_sorted(Array1::linspace(0.0, 1.0, 11)).unwrap();
        let actual: Vec<_> = Array1::linspace(0.0, 1.0, 11)
            .iter()
            .map(|&q| a.ppf(q))
            .collect();
        // from scipy.stats.mstats import mquantiles
        // mquantiles(np.linspace(0, 1, 11), prob=np.linspace(0, 1, 11), alphap=0.5, betap=0.5)
        let desired = [0., 0.06, 0.17, 0.28, 0.39, 0.5, 0.61, 0.72, 0.83, 0.94, 1.];
        for (a, d) in actual.iter().zip(desired.iter()) {
            assert_abs_diff_eq!(a, d, epsilon = 1e-12);
        }
    }

    #[test]
    fn from_sorted_rejects_unsorted() {
        assert_eq!(
            SortedArray::from_sorted(vec![1.0, 0.0]),
            Err(SortedArrayError::Unsorted)
        );
    }
}

use crate::maps::peak_map::{Peak, Spectrum};

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Peak with its own retention time
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CompactPeak {
    pub rt: f64,
    pub mz: f64,
    pub intensity: f64,
    #[serde(default)]
    pub original_rt: Option<f64>,
}

impl CompactPeak {
    pub fn new(rt: f64, mz: f64, intensity: f64) -> Self {
        Self {
            rt,
            mz,
            intensity,
            original_rt: None,
        }
    }
}

/// Lightweight run representation: a flat list of MS1 peaks
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CompactMap {
    pub peaks: Vec<CompactPeak>,
}

impl CompactMap {
    pub fn new(peaks: Vec<CompactPeak>) -> Self {
        Self { peaks }
    }

    /// Peaks grouped into MS1 spectra of equal retention time, sorted by retention time
    pub fn spectra(&self) -> Vec<Spectrum> {
        self.peaks
            .iter()
            .sorted_by(|a, b| a.rt.total_cmp(&b.rt))
            .chunk_by(|p| p.rt)
            .into_iter()
            .map(|(rt, peaks)| {
                Spectrum::new(
                    rt,
                    1,
                    peaks.map(|p| Peak {
                        mz: p.mz,
                        intensity: p.intensity,
                    }),
                )
            })
            .collect()
    }
}

impl FromIterator<CompactPeak> for CompactMap {
    fn from_iter<I: IntoIterator<Item = CompactPeak>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectra_are_grouped_by_rt() {
        let map: CompactMap = [
            CompactPeak::new(20.0, 400.0, 1.0),
            CompactPeak::new(10.0, 500.0, 2.0),
            CompactPeak::new(20.0, 600.0, 3.0),
        ]
        .into_iter()
        .collect();
        let spectra = map.spectra();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].rt, 10.0);
        assert_eq!(spectra[1].peaks.len(), 2);
        assert!(spectra.iter().all(|s| s.ms_level == 1));
    }
}

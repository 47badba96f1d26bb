use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

impl From<(f64, f64)> for Peak {
    fn from((mz, intensity): (f64, f64)) -> Self {
        Self { mz, intensity }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Spectrum {
    pub rt: f64,
    pub ms_level: u8,
    pub peaks: Vec<Peak>,
    #[serde(default)]
    pub original_rt: Option<f64>,
}

impl Spectrum {
    pub fn new(rt: f64, ms_level: u8, peaks: impl IntoIterator<Item = impl Into<Peak>>) -> Self {
        Self {
            rt,
            ms_level,
            peaks: peaks.into_iter().map(Into::into).collect(),
            original_rt: None,
        }
    }
}

/// Raw LC-MS run: spectra in acquisition order
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PeakMap {
    pub spectra: Vec<Spectrum>,
}

impl PeakMap {
    pub fn new(spectra: Vec<Spectrum>) -> Self {
        Self { spectra }
    }

    /// MS1 spectra sorted by retention time
    pub fn ms1_spectra(&self) -> Vec<&Spectrum> {
        let mut spectra: Vec<_> = self.spectra.iter().filter(|s| s.ms_level == 1).collect();
        spectra.sort_by(|a, b| a.rt.total_cmp(&b.rt));
        spectra
    }
}

impl FromIterator<Spectrum> for PeakMap {
    fn from_iter<I: IntoIterator<Item = Spectrum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

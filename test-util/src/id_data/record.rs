use serde::Deserialize;

/// Single identification row: best hit of a spectrum
#[derive(Clone, Debug, Deserialize)]
pub struct IdentificationRecord {
    pub sequence: String,
    pub rt: f64,
    pub mz: f64,
    pub score: f64,
}

#[derive(Deserialize)]
pub(super) struct ReferenceRecord {
    pub(super) sequence: String,
    pub(super) rt: f64,
}

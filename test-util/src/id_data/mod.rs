pub use record::IdentificationRecord;

use record::ReferenceRecord;
use types::Error;

use include_dir::{Dir, include_dir};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

mod csv_parser;
mod record;
mod types;

const IDENTIFICATIONS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/../test-data/identifications");

/// Retention times of every sequence in the common frame, one row per sequence
pub const REFERENCE_CSV_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../test-data/identifications/reference.csv"
);

/// Identification runs of the same sample with different retention time drifts, `run_0` is
/// undrifted
pub fn iter_identification_runs() -> impl Iterator<Item = (String, Vec<IdentificationRecord>)> {
    let mut files: Vec<_> = IDENTIFICATIONS_DIR
        .find("run_*.csv")
        .unwrap()
        .filter_map(|entry| entry.as_file())
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));
    files.into_iter().map(|file| {
        let name = file
            .path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap()
            .to_owned();
        let records = csv_parser::records_from_reader(file.contents()).unwrap();
        (name, records)
    })
}

fn reference_rts() -> Result<BTreeMap<String, f64>, Error> {
    let file = IDENTIFICATIONS_DIR
        .get_file("reference.csv")
        .ok_or(Error::MissingFile("reference.csv"))?;
    let records: Vec<ReferenceRecord> = csv_parser::records_from_reader(file.contents())?;
    Ok(records.into_iter().map(|r| (r.sequence, r.rt)).collect())
}

lazy_static! {
    pub static ref IDENTIFICATION_RUNS: Vec<(String, Vec<IdentificationRecord>)> =
        iter_identification_runs().collect();
    pub static ref REFERENCE_RTS: BTreeMap<String, f64> = reference_rts().unwrap();
}

#[derive(Debug, thiserror::Error)]
pub(super) enum Error {
    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error("{0} is missing from the test data")]
    MissingFile(&'static str),
}

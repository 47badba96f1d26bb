pub use id_data::{
    IDENTIFICATION_RUNS, IdentificationRecord, REFERENCE_CSV_PATH, REFERENCE_RTS, iter_identification_runs,
};

mod id_data;

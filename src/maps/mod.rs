//! Minimal in-memory LC-MS collections whose retention times can be aligned

mod apply;
pub use apply::ApplyTransformation;

mod compact_map;
pub use compact_map::{CompactMap, CompactPeak};

mod consensus_map;
pub use consensus_map::{ConsensusFeature, ConsensusMap, FeatureHandle};

mod feature_map;
pub use feature_map::{Feature, FeatureMap};

mod peak_map;
pub use peak_map::{Peak, PeakMap, Spectrum};

mod peptide_identification;
pub use peptide_identification::{PeptideHit, PeptideIdentification};

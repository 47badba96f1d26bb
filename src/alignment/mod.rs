//! Alignment algorithms producing one transformation per input run

mod algorithm;
pub use algorithm::{MapAlignmentAlgorithm, ModelSpec, fit_model};

mod identification;
pub use identification::{IdentificationAlignment, IdentificationAlignmentParams};

mod info;
pub use info::{AlignmentInfo, AlignmentInfoTrait, InputKind};

mod reference;
pub use reference::Reference;

mod spectrum;
pub use spectrum::{SpectrumAlignment, SpectrumAlignmentParams};

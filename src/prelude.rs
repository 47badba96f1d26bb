pub use crate::alignment::{AlignmentInfoTrait, MapAlignmentAlgorithm};
pub use crate::maps::ApplyTransformation;
pub use crate::model::TransformationModelTrait;

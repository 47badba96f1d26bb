pub use transformation_model::{Line, ModelType, TransformationModel, TransformationModelTrait};

pub mod b_spline;
pub mod identity;
pub mod interpolated;
pub mod linear;
pub mod lowess;
pub mod transformation_model;
pub mod weighting;

pub use b_spline::{BSplineExtrapolation, BSplineModel};
pub use identity::IdentityModel;
pub use interpolated::{ExtrapolationType, InterpolatedModel, InterpolationType};
pub use linear::LinearModel;
pub use lowess::LowessModel;
pub use weighting::{Axis, AxisWeighting, WeightFunction, Weighting};

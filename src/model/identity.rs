use crate::model::transformation_model::*;

macro_const! {
    const DOC: &str = r#"
Identity transformation, `f(x) = x`

Ignores the data it is fitted to and accepts no parameters.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IdentityModel {
    #[serde(skip)]
    weighting: Weighting,
}

impl IdentityModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(_data: &[DataPoint], params: &Params) -> Result<Self, AlignmentError> {
        params.reader().finish()?;
        Ok(Self::new())
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformationModelTrait for IdentityModel {
    fn model_type(&self) -> ModelType {
        ModelType::Identity
    }

    fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    #[inline]
    fn evaluate_weighted(&self, x: f64) -> f64 {
        x
    }

    fn parameters(&self) -> Params {
        Params::new()
    }

    fn domain(&self) -> Option<(f64, f64)> {
        None
    }

    fn closed_form_inverse(&self) -> Option<Result<TransformationModel, AlignmentError>> {
        Some(Ok(self.clone().into()))
    }
}

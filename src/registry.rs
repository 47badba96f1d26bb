use crate::alignment::{IdentificationAlignment, MapAlignmentAlgorithm, SpectrumAlignment};
use crate::data::DataPoint;
use crate::error::AlignmentError;
use crate::model::{ModelType, TransformationModel};
use crate::params::Params;

use lazy_static::lazy_static;
use std::collections::BTreeMap;

pub type ModelConstructor =
    fn(&[DataPoint], &Params) -> Result<TransformationModel, AlignmentError>;

pub type AlgorithmConstructor = fn() -> Box<dyn MapAlignmentAlgorithm>;

/// Name-keyed table of constructors
///
/// Lookup of an unregistered name fails with [AlignmentError::InvalidValue] listing the
/// registered names.
#[derive(Clone, Debug)]
pub struct Registry<C> {
    kind: &'static str,
    constructors: BTreeMap<String, C>,
}

impl<C: Copy> Registry<C> {
    /// Empty registry, `kind` names the registered things in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    /// Add a constructor, returns the constructor previously registered under the same name
    pub fn register(&mut self, name: impl Into<String>, constructor: C) -> Option<C> {
        self.constructors.insert(name.into(), constructor)
    }

    pub fn get(&self, name: &str) -> Result<C, AlignmentError> {
        self.constructors.get(name).copied().ok_or_else(|| {
            AlignmentError::invalid_choice(self.kind, name, self.names())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

pub type ModelRegistry = Registry<ModelConstructor>;

impl Registry<ModelConstructor> {
    /// Registry of all built-in [TransformationModel] variants
    pub fn with_defaults() -> Self {
        let mut registry = Self::new("model_type");
        registry.register(ModelType::Identity.name(), |data, params| {
            TransformationModel::fit(ModelType::Identity, data, params)
        });
        registry.register(ModelType::Linear.name(), |data, params| {
            TransformationModel::fit(ModelType::Linear, data, params)
        });
        registry.register(ModelType::Interpolated.name(), |data, params| {
            TransformationModel::fit(ModelType::Interpolated, data, params)
        });
        registry.register(ModelType::BSpline.name(), |data, params| {
            TransformationModel::fit(ModelType::BSpline, data, params)
        });
        registry.register(ModelType::Lowess.name(), |data, params| {
            TransformationModel::fit(ModelType::Lowess, data, params)
        });
        registry
    }

    pub fn create(
        &self,
        name: &str,
        data: &[DataPoint],
        params: &Params,
    ) -> Result<TransformationModel, AlignmentError> {
        self.get(name)?(data, params)
    }
}

pub type AlgorithmRegistry = Registry<AlgorithmConstructor>;

impl Registry<AlgorithmConstructor> {
    /// Registry of all built-in alignment algorithms
    pub fn with_defaults() -> Self {
        let mut registry = Self::new("algorithm");
        registry.register(IdentificationAlignment::NAME, || {
            Box::new(IdentificationAlignment::default())
        });
        registry.register(SpectrumAlignment::NAME, || {
            Box::new(SpectrumAlignment::default())
        });
        registry
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn MapAlignmentAlgorithm>, AlignmentError> {
        Ok(self.get(name)?())
    }
}

lazy_static! {
    pub static ref MODEL_REGISTRY: ModelRegistry = ModelRegistry::with_defaults();
    pub static ref ALGORITHM_REGISTRY: AlgorithmRegistry = AlgorithmRegistry::with_defaults();
}

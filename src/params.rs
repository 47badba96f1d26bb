use crate::error::AlignmentError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single configuration value
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric value, integers are converted
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Key-value model configuration
///
/// Every model documents the keys it recognizes; keys a model does not recognize are rejected
/// with [AlignmentError::InvalidValue] when the model is fitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [Params::insert]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy all entries of `other` over the entries of `self`
    pub fn merge(&mut self, other: &Params) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub(crate) fn reader(&self) -> ParamsReader {
        ParamsReader {
            remaining: self.0.clone(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Consumes recognized keys from a [Params] copy, so that leftovers can be reported
pub(crate) struct ParamsReader {
    remaining: BTreeMap<String, ParamValue>,
}

impl ParamsReader {
    pub fn take_f64(&mut self, key: &str) -> Result<Option<f64>, AlignmentError> {
        match self.remaining.remove(key) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(v)),
            Some(ParamValue::Int(v)) => Ok(Some(v as f64)),
            Some(v) => Err(AlignmentError::invalid_value(key, v)),
        }
    }

    pub fn take_usize(&mut self, key: &str) -> Result<Option<usize>, AlignmentError> {
        match self.remaining.remove(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => usize::try_from(v)
                .map(Some)
                .map_err(|_| AlignmentError::invalid_value(key, v)),
            Some(v) => Err(AlignmentError::invalid_value(key, v)),
        }
    }

    pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>, AlignmentError> {
        match self.remaining.remove(key) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(v)),
            Some(ParamValue::Text(s)) if s == "true" => Ok(Some(true)),
            Some(ParamValue::Text(s)) if s == "false" => Ok(Some(false)),
            Some(v) => Err(AlignmentError::invalid_value(key, v)),
        }
    }

    pub fn take_text(&mut self, key: &str) -> Result<Option<String>, AlignmentError> {
        match self.remaining.remove(key) {
            None => Ok(None),
            Some(ParamValue::Text(v)) => Ok(Some(v)),
            Some(v) => Err(AlignmentError::invalid_value(key, v)),
        }
    }

    /// Fails on the first key nobody asked for
    pub fn finish(self) -> Result<(), AlignmentError> {
        match self.remaining.into_iter().next() {
            None => Ok(()),
            Some((key, value)) => Err(AlignmentError::invalid_value(
                format!("unrecognized parameter {key}"),
                value,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_rejects_unknown_keys() {
        let params = Params::new().with("slope", 2.0).with("colour", "blue");
        let mut reader = params.reader();
        assert_eq!(reader.take_f64("slope").unwrap(), Some(2.0));
        assert!(matches!(
            reader.finish(),
            Err(AlignmentError::InvalidValue { .. })
        ));
    }

    #[test]
    fn reader_converts_integers_to_floats() {
        let params = Params::new().with("x_datum_min", 1);
        let mut reader = params.reader();
        assert_eq!(reader.take_f64("x_datum_min").unwrap(), Some(1.0));
        reader.finish().unwrap();
    }

    #[test]
    fn reader_rejects_wrong_types() {
        let params = Params::new().with("num_nodes", 2.5);
        let mut reader = params.reader();
        assert!(reader.take_usize("num_nodes").is_err());

        let params = Params::new().with("num_nodes", -1);
        assert!(params.reader().take_usize("num_nodes").is_err());
    }

    #[test]
    fn serde_is_a_plain_map() {
        let params = Params::new()
            .with("x_weight", "ln(x)")
            .with("num_nodes", 7)
            .with("smoothing", 0.5)
            .with("symmetric_regression", true);
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(
            json,
            r#"{"num_nodes":7,"smoothing":0.5,"symmetric_regression":true,"x_weight":"ln(x)"}"#
        );
        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}

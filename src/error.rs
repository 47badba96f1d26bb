/// Error returned from transformation models, descriptions and alignment algorithms
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AlignmentError {
    #[error("{algorithm} does not implement {operation}")]
    NotImplemented {
        algorithm: &'static str,
        operation: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid value {value:?} for {name}{}", expected_suffix(.expected))]
    InvalidValue {
        name: String,
        value: String,
        expected: Vec<String>,
    },

    #[error("unable to fit {model} model: {reason}")]
    UnableToFit { model: &'static str, reason: String },
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected one of {expected:?}")
    }
}

impl AlignmentError {
    pub(crate) fn invalid_value(name: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.to_string(),
            expected: vec![],
        }
    }

    pub(crate) fn invalid_choice<'a>(
        name: impl Into<String>,
        value: impl ToString,
        expected: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.to_string(),
            expected: expected.into_iter().map(String::from).collect(),
        }
    }

    pub(crate) fn unable_to_fit(model: &'static str, reason: impl Into<String>) -> Self {
        Self::UnableToFit {
            model,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SortedArrayError {
    #[error("SortedArray constructors accept sorted arrays only")]
    Unsorted,

    #[error("SortedArray constructors accept contiguous arrays only")]
    NonContiguous,
}

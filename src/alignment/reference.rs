use crate::error::AlignmentError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference frame of an alignment run
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// Zero-based index of an input run
    Index(usize),
    /// CSV file with `sequence,rt` rows
    File(PathBuf),
}

impl Reference {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_owned())
    }

    /// Index reference within `0..num_runs`, file references are not checked
    pub(crate) fn check_index(&self, num_runs: usize) -> Result<(), AlignmentError> {
        match self {
            Self::Index(index) if *index >= num_runs => Err(AlignmentError::InvalidParameter(
                format!("reference index {index} is out of range for {num_runs} runs"),
            )),
            _ => Ok(()),
        }
    }

    /// File references must name an existing file
    pub(crate) fn check_file(&self) -> Result<(), AlignmentError> {
        match self {
            Self::File(path) if path.as_os_str().is_empty() => Err(
                AlignmentError::InvalidParameter("reference file path is empty".to_owned()),
            ),
            Self::File(path) if !path.is_file() => Err(AlignmentError::InvalidParameter(format!(
                "reference file {} does not exist",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::File(_) => None,
        }
    }
}

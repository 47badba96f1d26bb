use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of collection an alignment algorithm can be run on
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    PeakMaps,
    CompactMaps,
    FeatureMaps,
    ConsensusMaps,
    PeptideIdentifications,
}

impl InputKind {
    pub const ALL: [Self; 5] = [
        Self::PeakMaps,
        Self::CompactMaps,
        Self::FeatureMaps,
        Self::ConsensusMaps,
        Self::PeptideIdentifications,
    ];
}

/// Static description of an alignment algorithm
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AlignmentInfo {
    pub name: &'static str,
    /// Whether a reference run or file can be chosen, otherwise the algorithm picks its own
    pub reference_support: bool,
    /// Inputs implemented by the algorithm itself
    pub inputs: &'static [InputKind],
}

impl AlignmentInfo {
    /// Consensus maps are supported through feature maps
    pub fn supports(&self, kind: InputKind) -> bool {
        self.inputs.contains(&kind)
            || (kind == InputKind::ConsensusMaps && self.inputs.contains(&InputKind::FeatureMaps))
    }
}

pub trait AlignmentInfoTrait {
    fn info(&self) -> &AlignmentInfo;
}

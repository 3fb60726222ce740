//! Chaining strategies: how documents are fed to the model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Orchestration pattern for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    /// Everything in one prompt
    #[default]
    Stuff,
    /// Summarise each chunk, then combine the partial summaries
    MapReduce,
    /// Build a summary incrementally, one chunk at a time
    Refine,
}

impl ChainType {
    pub const ALL: [ChainType; 3] = [Self::Stuff, Self::MapReduce, Self::Refine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stuff => "stuff",
            Self::MapReduce => "map_reduce",
            Self::Refine => "refine",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Stuff => "Send the whole document in a single prompt",
            Self::MapReduce => "Summarise each chunk, then combine the partial summaries",
            Self::Refine => "Summarise the first chunk, then refine with each following chunk",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported chain_type {0}")]
pub struct UnknownChainType(pub String);

impl FromStr for ChainType {
    type Err = UnknownChainType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "stuff" => Ok(Self::Stuff),
            "map_reduce" => Ok(Self::MapReduce),
            "refine" => Ok(Self::Refine),
            _ => Err(UnknownChainType(s.to_string())),
        }
    }
}

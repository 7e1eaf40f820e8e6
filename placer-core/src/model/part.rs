//! Parts and packages

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A part footprint and the nozzle tips that can handle it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Package {
    pub id: String,
    pub compatible_tips: Vec<String>,
}

impl Package {
    pub fn new<I, T>(id: impl Into<String>, compatible_tips: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            compatible_tips: compatible_tips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts(&self, tip: &str) -> bool {
        self.compatible_tips.iter().any(|t| t == tip)
    }
}

/// A part type as stocked in feeders
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    pub id: String,
    /// Height above the board surface, if known
    pub height: Option<f64>,
    pub package: Option<String>,
    /// Extra whole-part attempts after a failed feed or pick
    pub pick_retry_count: u32,
}

impl Part {
    pub fn new(id: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            height: None,
            package: Some(package.into()),
            pick_retry_count: 0,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_pick_retry_count(mut self, count: u32) -> Self {
        self.pick_retry_count = count;
        self
    }
}

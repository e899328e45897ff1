//! Status Color Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status tag shared by checks and tables (状态颜色)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    /// Default
    Blue,
    /// Closing / turnover
    Green,
    /// Needs special attention
    Purple,
}

impl StatusColor {
    /// Picker order
    pub const ALL: [StatusColor; 3] = [StatusColor::Blue, StatusColor::Green, StatusColor::Purple];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
            StatusColor::Purple => "purple",
        }
    }

    /// Picker label
    pub const fn label(&self) -> &'static str {
        match self {
            StatusColor::Blue => "Blue",
            StatusColor::Green => "Green",
            StatusColor::Purple => "Purple",
        }
    }

    /// Picker description (workflow meaning)
    pub const fn description(&self) -> &'static str {
        match self {
            StatusColor::Blue => "Default",
            StatusColor::Green => "Closing/Turnover",
            StatusColor::Purple => "Needs special attention",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a color name is not one of blue/green/purple
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status color: {0}")]
pub struct UnknownStatusColor(pub String);

impl FromStr for StatusColor {
    type Err = UnknownStatusColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(StatusColor::Blue),
            "green" => Ok(StatusColor::Green),
            "purple" => Ok(StatusColor::Purple),
            other => Err(UnknownStatusColor(other.to_string())),
        }
    }
}

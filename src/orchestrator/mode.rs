use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::BoostError;

/// Standing configuration applied directly, outside the boost/restore cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Boost scheme, background services stopped, latency tweaks on
    Competitive,
    /// High performance scheme with stock latency settings
    Graphics,
    /// Balanced scheme with stock latency settings
    Balanced,
    /// Normal TCP receive window autotuning
    Network,
    /// Hardware gamma ramp disabled
    Color,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[
            Mode::Competitive,
            Mode::Graphics,
            Mode::Balanced,
            Mode::Network,
            Mode::Color,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Competitive => "competitive",
            Mode::Graphics => "graphics",
            Mode::Balanced => "balanced",
            Mode::Network => "network",
            Mode::Color => "color",
        }
    }
}

impl FromStr for Mode {
    type Err = BoostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BoostError::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

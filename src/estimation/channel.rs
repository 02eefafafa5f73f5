//! Channel configuration table for the latency estimator.
//!
//! Each entry names a dataset column and the crossing rule used to decide when
//! that column "reacted" to an occupancy transition. Entries are loaded from the
//! `[[channels]]` array of `config.toml`; [`default_channels`] reproduces the
//! dashboard's stock PIR/light/sound/CO2 set.

use crate::dataset::Column;
use serde::{Deserialize, Serialize};

/// Half-width (positions) of the symmetric window used for motion indicators.
pub const DEFAULT_EDGE_HALF_WIDTH: usize = 50;
/// Forward reach (positions) of the window used for threshold channels.
pub const DEFAULT_THRESHOLD_FORWARD: usize = 200;
/// Sound and CO2 search exactly 200 positions starting at the event, one fewer than light.
pub const DEFAULT_SOUND_CO2_FORWARD: usize = DEFAULT_THRESHOLD_FORWARD - 1;

pub const DEFAULT_LIGHT_THRESHOLD: f64 = 40.0;
pub const DEFAULT_SOUND_THRESHOLD: f64 = 1.3;
pub const DEFAULT_CO2_THRESHOLD: f64 = 700.0;

/// How a channel is searched around a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CrossingRule {
    /// Closest value change within `[event - half_width, event + half_width]`.
    EdgeChange {
        #[serde(default = "default_half_width")]
        half_width: usize,
    },
    /// First value strictly above `threshold` within `[event, event + forward]`.
    Threshold {
        threshold: f64,
        #[serde(default = "default_forward")]
        forward: usize,
    },
}

impl CrossingRule {
    pub fn kind(&self) -> &'static str {
        match self {
            CrossingRule::EdgeChange { .. } => "edge_change",
            CrossingRule::Threshold { .. } => "threshold",
        }
    }
}

fn default_half_width() -> usize {
    DEFAULT_EDGE_HALF_WIDTH
}

fn default_forward() -> usize {
    DEFAULT_THRESHOLD_FORWARD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub column: Column,
    #[serde(flatten)]
    pub rule: CrossingRule,
}

impl ChannelConfig {
    pub fn edge_change(name: impl Into<String>, column: Column, half_width: usize) -> Self {
        Self {
            name: name.into(),
            column,
            rule: CrossingRule::EdgeChange { half_width },
        }
    }

    pub fn threshold(
        name: impl Into<String>,
        column: Column,
        threshold: f64,
        forward: usize,
    ) -> Self {
        Self {
            name: name.into(),
            column,
            rule: CrossingRule::Threshold { threshold, forward },
        }
    }
}

pub fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::edge_change("PIR", Column::S6Pir, DEFAULT_EDGE_HALF_WIDTH),
        ChannelConfig::threshold(
            "Light",
            Column::S1Light,
            DEFAULT_LIGHT_THRESHOLD,
            DEFAULT_THRESHOLD_FORWARD,
        ),
        ChannelConfig::threshold(
            "Sound",
            Column::S1Sound,
            DEFAULT_SOUND_THRESHOLD,
            DEFAULT_SOUND_CO2_FORWARD,
        ),
        ChannelConfig::threshold(
            "CO2",
            Column::S5Co2,
            DEFAULT_CO2_THRESHOLD,
            DEFAULT_SOUND_CO2_FORWARD,
        ),
    ]
}

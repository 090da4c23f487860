//! Override points of the decoding and gating stages.
//!
//! Values are normally supplied by the command line layer. Every struct
//! deserializes with serde and falls back to the defaults for missing keys.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REPUBLISH_THRESHOLD: u32 = 50;
pub const DEFAULT_MAX_POWER_W: f64 = 100_000.0;
pub const DEFAULT_MAX_ENERGY_KWH: f64 = 10_000_000.0;

/// Physical plausibility limits applied to every decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub max_power_w: f64,
    pub max_energy_kwh: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            max_power_w: DEFAULT_MAX_POWER_W,
            max_energy_kwh: DEFAULT_MAX_ENERGY_KWH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Number of accepted datagrams after which every field is sent again.
    pub republish_threshold: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            republish_threshold: DEFAULT_REPUBLISH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub bounds: Bounds,
    pub gate: GateConfig,
}

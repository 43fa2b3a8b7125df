use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Priming,
    Drifting,
    Correcting,
    Recovery,
    Probing,
    Calibrating,
}

impl ThermalState {
    pub const ALL: [ThermalState; 6] = [
        ThermalState::Priming,
        ThermalState::Drifting,
        ThermalState::Correcting,
        ThermalState::Recovery,
        ThermalState::Probing,
        ThermalState::Calibrating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThermalState::Priming => "priming",
            ThermalState::Drifting => "drifting",
            ThermalState::Correcting => "correcting",
            ThermalState::Recovery => "recovery",
            ThermalState::Probing => "probing",
            ThermalState::Calibrating => "calibrating",
        }
    }

    /// States in which the building is left alone long enough to observe drift.
    pub fn allows_probing(&self) -> bool {
        matches!(self, ThermalState::Drifting | ThermalState::Probing)
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThermalState {
    type Err = String;

    /// Case-insensitive, so both `"drifting"` and `"DRIFTING"` parse.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        ThermalState::ALL
            .into_iter()
            .find(|state| state.as_str() == lowered)
            .ok_or_else(|| format!("unknown thermal state '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    HeatCool,
    Auto,
    Dry,
    FanOnly,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::HeatCool => "heat_cool",
            HvacMode::Auto => "auto",
            HvacMode::Dry => "dry",
            HvacMode::FanOnly => "fan_only",
        }
    }

    pub fn is_off(&self) -> bool {
        *self == HvacMode::Off
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "off" => Ok(HvacMode::Off),
            "heat" => Ok(HvacMode::Heat),
            "cool" => Ok(HvacMode::Cool),
            "heat_cool" => Ok(HvacMode::HeatCool),
            "auto" => Ok(HvacMode::Auto),
            "dry" => Ok(HvacMode::Dry),
            "fan_only" => Ok(HvacMode::FanOnly),
            _ => Err(format!("unknown hvac mode '{value}'")),
        }
    }
}

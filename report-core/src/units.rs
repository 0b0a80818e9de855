//! FILENAME: report-core/src/units.rs
//! PURPOSE: Distance and fuel-economy conversion consumed by the report engine.
//! CONTEXT: Readings are stored in kilometres and litres. Reports show them in
//! the caller's preferred unit: miles with MPG (imperial gallons), or km with
//! km/l. The engine only talks to the `UnitConverter` trait so tests can swap in
//! an identity conversion.

use serde::{Deserialize, Serialize};

pub const KM_TO_MILES: f64 = 0.621371;
pub const LITRES_TO_GALLONS: f64 = 0.219969;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    #[serde(alias = "kilometres", alias = "kilometers")]
    Km,
}

impl DistanceUnit {
    /// Reads a request parameter. `mi` and `miles` mean miles; anything else is km.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mi" | "miles" => DistanceUnit::Miles,
            _ => DistanceUnit::Km,
        }
    }

    /// Canonical parameter spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "miles",
            DistanceUnit::Km => "km",
        }
    }
}

/// Pure conversion functions. No I/O.
pub trait UnitConverter {
    fn unit(&self) -> DistanceUnit;

    /// Kilometres to the display unit.
    fn to_display_distance(&self, km: f64) -> f64;

    /// Economy figure for a distance (km) covered on a quantity (litres).
    fn economy(&self, distance_km: f64, litres: f64) -> f64;

    fn distance_label(&self) -> &'static str {
        match self.unit() {
            DistanceUnit::Miles => "Miles",
            DistanceUnit::Km => "km",
        }
    }

    fn economy_label(&self) -> &'static str {
        match self.unit() {
            DistanceUnit::Miles => "MPG",
            DistanceUnit::Km => "km/l",
        }
    }
}

/// Miles/MPG or km/km-per-litre, rounded the way reports display them:
/// distances to whole units, economy to two decimals.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnits {
    unit: DistanceUnit,
}

impl StandardUnits {
    pub fn new(unit: DistanceUnit) -> Self {
        StandardUnits { unit }
    }
}

impl UnitConverter for StandardUnits {
    fn unit(&self) -> DistanceUnit {
        self.unit
    }

    fn to_display_distance(&self, km: f64) -> f64 {
        match self.unit {
            DistanceUnit::Miles => (km * KM_TO_MILES).round(),
            DistanceUnit::Km => km.round(),
        }
    }

    fn economy(&self, distance_km: f64, litres: f64) -> f64 {
        if litres <= 0.0 {
            return 0.0;
        }
        let raw = match self.unit {
            DistanceUnit::Miles => {
                let gallons = litres * LITRES_TO_GALLONS;
                (distance_km * KM_TO_MILES) / gallons
            }
            DistanceUnit::Km => distance_km / litres,
        };
        (raw * 100.0).round() / 100.0
    }
}

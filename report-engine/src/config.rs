//! FILENAME: report-engine/src/config.rs
//! PURPOSE: Engine-wide settings, loadable from a JSON configuration file.
//! CONTEXT: Every field defaults, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use report_core::DistanceUnit;
use report_render::{FlowConfig, GridConfig};

use crate::error::ReportError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub flow: FlowConfig,
    /// Used when a request carries no `distanceUnit` parameter.
    pub default_distance_unit: DistanceUnit,
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_distance_unit, DistanceUnit::Miles);
    }

    #[test]
    fn test_nested_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{ "grid": { "fontName": "Arial" }, "defaultDistanceUnit": "km" }"#,
        )
        .unwrap();
        assert_eq!(config.grid.font_name, "Arial");
        assert_eq!(config.grid.font_size, 9.0);
        assert_eq!(config.default_distance_unit, DistanceUnit::Km);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ grid"),
            Err(ReportError::Config(_))
        ));
    }
}

use orthonet_core::{EngineConfig, GeometryPolicy};
use serde::{Deserialize, Serialize};

/// Descriptive metadata stored with a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

impl ProjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            created: String::new(),
            modified: String::new(),
        }
    }
}

/// Editor settings persisted per document; the engine configuration is
/// derived from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub grid_size: f64,
    pub snap_to_grid: bool,
    /// Coordinate tolerance.
    pub epsilon: f64,
    pub max_normalize_passes: usize,
    pub history_limit: usize,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ProjectSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            grid_size: config.geometry.grid_step,
            snap_to_grid: config.geometry.snap_to_grid,
            epsilon: config.geometry.epsilon,
            max_normalize_passes: config.max_normalize_passes,
            history_limit: config.history_limit,
        }
    }
}

impl ProjectSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            geometry: GeometryPolicy {
                epsilon: self.epsilon,
                grid_step: self.grid_size,
                snap_to_grid: self.snap_to_grid,
            },
            max_normalize_passes: self.max_normalize_passes,
            history_limit: self.history_limit,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip_through_engine_config() {
        let settings = ProjectSettings {
            grid_size: 2.54,
            snap_to_grid: true,
            ..ProjectSettings::default()
        };
        let config = settings.engine_config();
        assert!(config.geometry.snap_to_grid);
        assert_eq!(ProjectSettings::from(&config), settings);
    }

    #[test]
    fn test_missing_settings_fields_default() {
        let settings: ProjectSettings = serde_json::from_str(r#"{ "grid_size": 5.0 }"#).unwrap();
        assert_eq!(settings.grid_size, 5.0);
        assert_eq!(settings.max_normalize_passes, 8);
    }
}

use crate::NavError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime limits for a navigator session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Maximum number of ancestor clusters kept for `..` navigation.
    pub max_depth: usize,
    /// Maximum number of simultaneously open files.
    pub max_open_files: usize,
    /// Optional cap on FAT chain walks. The volume's cluster count is always an upper bound.
    pub max_chain_steps: Option<u32>,
    /// Sectors kept in the image file cache.
    pub cache_sectors: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_open_files: 100,
            max_chain_steps: None,
            cache_sectors: 1000,
        }
    }
}

impl NavigatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, NavError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            NavError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if self.max_open_files == 0 {
            return Err(NavError::Configuration("max_open_files must be at least 1".into()));
        }
        if self.max_chain_steps == Some(0) {
            return Err(NavError::Configuration("max_chain_steps must be at least 1".into()));
        }
        Ok(())
    }

    /// Effective step bound for chain walks on a volume with `total_clusters` data clusters.
    pub fn chain_step_limit(&self, total_clusters: u32) -> u32 {
        let natural = total_clusters.max(1);
        match self.max_chain_steps {
            Some(limit) => limit.min(natural).max(1),
            None => natural,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NavigatorConfig::default();
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.max_open_files, 100);
        assert_eq!(config.max_chain_steps, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = NavigatorConfig::from_json_str(r#"{ "max_open_files": 4 }"#).unwrap();
        assert_eq!(config.max_open_files, 4);
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.cache_sectors, 1000);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            NavigatorConfig::from_json_str(r#"{ "max_open_files": 0 }"#),
            Err(NavError::Configuration(_))
        ));
        assert!(matches!(
            NavigatorConfig::from_json_str("not json"),
            Err(NavError::Serialization(_))
        ));
    }

    #[test]
    fn test_chain_step_limit() {
        let mut config = NavigatorConfig::default();
        assert_eq!(config.chain_step_limit(1000), 1000);
        assert_eq!(config.chain_step_limit(0), 1);

        config.max_chain_steps = Some(50);
        assert_eq!(config.chain_step_limit(1000), 50);
        assert_eq!(config.chain_step_limit(10), 10);
    }
}

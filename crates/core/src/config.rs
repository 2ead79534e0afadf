use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{HerdbookError, Result};
use crate::pedigree::{DuplicatePolicy, LayoutConfig};
use crate::types::{DEFAULT_LEVEL, MAX_SUPPORTED_LEVEL};

/// Tree request defaults and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeOptions {
    /// Generations to assemble when a request names none.
    pub level: u32,
    /// Deepest level a caller may request.
    pub max_level: u32,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            max_level: 12,
            duplicate_policy: DuplicatePolicy::FirstWins,
        }
    }
}

impl TreeOptions {
    /// Same options with `level` replaced, e.g. from a request parameter.
    pub fn with_level(&self, level: u32) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }

    /// # Errors
    /// Returns [`HerdbookError::InvalidLevel`] if `max_level` exceeds the
    /// supported ceiling or `level` exceeds `max_level`.
    pub fn validate(&self) -> Result<()> {
        if self.max_level > MAX_SUPPORTED_LEVEL {
            return Err(HerdbookError::InvalidLevel {
                level: self.max_level,
                max: MAX_SUPPORTED_LEVEL,
            });
        }
        if self.level > self.max_level {
            return Err(HerdbookError::InvalidLevel {
                level: self.level,
                max: self.max_level,
            });
        }
        Ok(())
    }
}

/// All tunables, loadable from a JSON file. Absent sections keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HerdbookConfig {
    pub tree: TreeOptions,
    pub layout: LayoutConfig,
    pub cache: CacheConfig,
}

impl HerdbookConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.tree.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.tree.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::Orientation;

    #[test]
    fn test_defaults() {
        let c = HerdbookConfig::default();
        assert_eq!(c.tree.level, 4);
        assert_eq!(c.cache.fresh_for_secs, 600);
        assert_eq!(c.cache.retain_for_secs, 900);
        assert_eq!(c.cache.retries, 1);
        assert!(c.tree.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c = HerdbookConfig::from_json_str(
            r#"{"tree": {"level": 6}, "layout": {"orientation": "topToBottom"}}"#,
        )
        .unwrap();
        assert_eq!(c.tree.level, 6);
        assert_eq!(c.tree.max_level, 12);
        assert_eq!(c.layout.orientation, Orientation::TopToBottom);
        assert_eq!(c.layout.node_width, 160.0);
    }

    #[test]
    fn test_level_above_max_rejected() {
        let err = HerdbookConfig::from_json_str(r#"{"tree": {"level": 9, "maxLevel": 5}}"#)
            .unwrap_err();
        assert!(matches!(err, HerdbookError::InvalidLevel { level: 9, max: 5 }));

        let opts = TreeOptions::default().with_level(MAX_SUPPORTED_LEVEL + 1);
        assert!(opts.validate().is_err());
    }
}

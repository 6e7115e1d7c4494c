//! Cast pipeline configuration loader.

use std::path::Path;

use anyhow::ensure;
use spell_core::CastConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`CastConfig`] from TOML files.
///
/// Keys missing from the file keep their default value.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<CastConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse config data from TOML text and check its ranges.
    pub fn parse(content: &str) -> LoadResult<CastConfig> {
        let config: CastConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        ensure!(
            config.default_cone_angle > 0.0 && config.default_cone_angle <= 360.0,
            "default_cone_angle must be within (0, 360], got {}",
            config.default_cone_angle
        );
        ensure!(
            config.channel_pushback_pct <= 100,
            "channel_pushback_pct must be at most 100, got {}",
            config.channel_pushback_pct
        );
        ensure!(
            config.min_missile_distance >= 0.0,
            "min_missile_distance must not be negative"
        );
        Ok(config)
    }
}

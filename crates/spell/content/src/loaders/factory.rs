//! Content factory for building the catalog and config from a data directory.

use std::path::{Path, PathBuf};

use spell_core::CastConfig;

use crate::catalog::SpellCatalog;
use crate::loaders::{ConfigLoader, LoadResult, SpellLoader};

/// Content factory that loads all spell content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── spells.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load cast configuration from `config.toml`, falling back to the
    /// defaults when the file does not exist.
    pub fn load_config(&self) -> LoadResult<CastConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(CastConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the spell catalog from `spells.ron`.
    pub fn load_catalog(&self) -> LoadResult<SpellCatalog> {
        let path = self.data_dir.join("spells.ron");
        SpellLoader::load(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = ContentFactory::new(dir.path());

        assert_eq!(factory.load_config().expect("config"), CastConfig::DEFAULT);
        assert!(factory.load_catalog().is_err());
    }

    #[test]
    fn loads_files_from_the_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.toml"), "cast_pushback_ms = 250\n").expect("write");
        std::fs::write(
            dir.path().join("spells.ron"),
            r#"(spells: [(id: SpellId(5), name: "Blink")])"#,
        )
        .expect("write");

        let factory = ContentFactory::new(dir.path());
        assert_eq!(factory.load_config().expect("config").cast_pushback_ms, 250);
        assert_eq!(factory.load_catalog().expect("catalog").ids(), vec![spell_core::SpellId(5)]);
    }
}

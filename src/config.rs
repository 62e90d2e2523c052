use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::filter::ViewMode;
use crate::sort::{DatablockSortMode, FileSortMode};

const CONFIG_ENV_PATH: &str = "MEMINSIGHT_CONFIG";

/// Config file as written by the user. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    view: Option<String>,
    file_sort: Option<String>,
    datablock_sort: Option<String>,
    show_zero_size: Option<bool>,
}

/// Initial viewer settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ViewerConfig {
    pub view: ViewMode,
    pub file_sort: FileSortMode,
    /// Mode of datablock tables that were never sorted by hand.
    pub datablock_sort: DatablockSortMode,
    pub show_zero_size: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            view: ViewMode::Files,
            file_sort: FileSortMode::DEFAULT,
            datablock_sort: DatablockSortMode::DEFAULT,
            show_zero_size: false,
        }
    }
}

impl ViewerConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|message| ReportError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses configuration from a YAML string. Unknown values fall back to
    /// the defaults, invalid sort modes are logged.
    pub fn parse(yaml: &str) -> std::result::Result<Self, String> {
        let raw: RawConfig = if yaml.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| e.to_string())?
        };

        let mut config = Self::default();
        if let Some(view) = raw.view.as_deref() {
            match ViewMode::from_str(view) {
                Some(view) => config.view = view,
                None => log::warn!("Unknown view mode in config: {}", view),
            }
        }
        if let Some(mode) = raw.file_sort.as_deref() {
            config.file_sort = FileSortMode::parse_or_default(mode);
        }
        if let Some(mode) = raw.datablock_sort.as_deref() {
            config.datablock_sort = DatablockSortMode::parse_or_default(mode);
        }
        if let Some(show) = raw.show_zero_size {
            config.show_zero_size = show;
        }
        Ok(config)
    }

    /// Loads `path`, or the default location when `None`. A missing file
    /// yields the defaults, a broken one is logged and ignored.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => config_file_path(),
        };

        if !path.exists() {
            log::debug!("No config at {}", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("{}; using defaults", err);
                Self::default()
            }
        }
    }
}

fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_PATH) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    dirs::config_dir()
        .map(|p| p.join("meminsight/config.yaml"))
        .unwrap_or_else(|| std::env::temp_dir().join("meminsight.config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = ViewerConfig::default();
        assert_eq!(config.view, ViewMode::Files);
        assert_eq!(config.file_sort, FileSortMode::SizeDesc);
        assert_eq!(config.datablock_sort, DatablockSortMode::PercentageDesc);
        assert!(!config.show_zero_size);
    }

    #[test]
    fn test_config_parse_full() {
        let yaml = "view: datablocks\nfile_sort: name-asc\ndatablock_sort: size-desc\nshow_zero_size: true\n";
        let config = ViewerConfig::parse(yaml).unwrap();
        assert_eq!(config.view, ViewMode::Datablocks);
        assert_eq!(config.file_sort, FileSortMode::NameAsc);
        assert_eq!(config.datablock_sort, DatablockSortMode::SizeDesc);
        assert!(config.show_zero_size);
    }

    #[test]
    fn test_config_parse_ignores_invalid_values() {
        let yaml = "view: tree\nfile_sort: sideways\ndatablock_sort: nope\n";
        assert_eq!(ViewerConfig::parse(yaml).unwrap(), ViewerConfig::default());
        assert_eq!(ViewerConfig::parse("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_config_parse_error() {
        assert!(ViewerConfig::parse("show_zero_size: [1, 2").is_err());
    }

    #[test]
    fn test_load_or_default_with_broken_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "show_zero_size: {{").unwrap();
        let config = ViewerConfig::load_or_default(Some(file.path()));
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ViewerConfig::load_or_default(Some(&dir.path().join("absent.yaml")));
        assert_eq!(config, ViewerConfig::default());
    }
}

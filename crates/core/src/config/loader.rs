//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, a standard location, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing file in the
    /// standard locations just means defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                let expanded = expand_path(p)?;
                if !expanded.exists() {
                    return Err(Error::config_not_found(&expanded));
                }
                Some(expanded)
            }
            None => find_config_file(),
        };

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };

        validate(&schema)?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

fn expand_path(path: &str) -> Result<PathBuf> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| Error::config(format!("Failed to expand config path {}: {}", path, e)))
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let local = [".safetrip.toml", "safetrip.toml"]
        .into_iter()
        .map(PathBuf::from);
    let user = dirs::config_dir().map(|dir| dir.join("safetrip").join("config.toml"));

    local.chain(user).find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e).with_context(format!("Reading config file {}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::from(e).with_context(format!("Parsing {}", path.display())))
}

fn validate(schema: &ConfigSchema) -> Result<()> {
    let tracking = &schema.tracking;
    if tracking.fix_timeout_secs == 0 {
        return Err(Error::invalid_config_value(
            "tracking.fix_timeout_secs",
            "must be at least 1",
        ));
    }
    if !(tracking.poor_signal_threshold_m.is_finite() && tracking.poor_signal_threshold_m > 0.0) {
        return Err(Error::invalid_config_value(
            "tracking.poor_signal_threshold_m",
            "must be a positive number of meters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.tracking.fix_timeout_secs, 10);
        assert_eq!(config.schema.tracking.max_fix_age_secs, 60);
        assert_eq!(config.schema.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[tracking]\nfix_timeout_secs = 3\n");
        let config = Config::load(file.path().to_str()).unwrap();

        assert_eq!(config.schema.tracking.fix_timeout_secs, 3);
        assert_eq!(config.schema.tracking.max_fix_age_secs, 60);
        assert!(config.schema.tracking.high_accuracy);
        assert_eq!(config.schema.tracking.poor_signal_threshold_m, 1000.0);
        assert!(!config.schema.logging.json);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Config::load(Some("/definitely/not/here/safetrip.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[tracking\nfix_timeout_secs = ");
        let err = Config::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config("[tracking]\nfix_timeout_secs = 0\n");
        let err = Config::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }
}

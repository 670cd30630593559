use std::path::Path;

use crate::config::schema::{Config, LogFormat};
use crate::error::ConfigError;

pub const ENV_DATA_DIR: &str = "CLIPOD_DATA_DIR";
pub const ENV_STATUS_DIR: &str = "CLIPOD_STATUS_DIR";
pub const ENV_CLIPS_DIR: &str = "CLIPOD_CLIPS_DIR";
pub const ENV_LOG_FORMAT: &str = "CLIPOD_LOG_FORMAT";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Config with no file: defaults plus environment overrides.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Environment variables take precedence over the file. Empty values are
/// ignored.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(dir) = env_value(ENV_DATA_DIR) {
        config.data_directory = dir;
    }
    if let Some(dir) = env_value(ENV_STATUS_DIR) {
        config.status_directory = Some(dir);
    }
    if let Some(dir) = env_value(ENV_CLIPS_DIR) {
        config.clips_directory = Some(dir);
    }
    if let Some(format) = env_value(ENV_LOG_FORMAT) {
        config.log_format =
            format
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::Validation {
                    message: format!("{}: {}", ENV_LOG_FORMAT, message),
                })?;
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.data_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "data_directory must not be empty".to_string(),
        });
    }

    for (name, value) in [
        ("status_directory", &config.status_directory),
        ("clips_directory", &config.clips_directory),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty when set", name),
            });
        }
    }

    if config.retention_hours == Some(0) {
        return Err(ConfigError::Validation {
            message: "retention_hours must be at least 1".to_string(),
        });
    }

    if config.status_directory() == config.clips_directory() {
        return Err(ConfigError::Validation {
            message: "status_directory and clips_directory must differ".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn clear_env() {
        for name in [ENV_DATA_DIR, ENV_STATUS_DIR, ENV_CLIPS_DIR, ENV_LOG_FORMAT] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_empty_object_uses_defaults() {
        clear_env();
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.data_directory, ".");
        assert_eq!(config.status_directory(), PathBuf::from("./status"));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.retention_hours.is_none());
    }

    #[test]
    #[serial]
    fn test_load_full_config() {
        clear_env();
        let json = r#"{
            "data_directory": "/srv/clipod",
            "clips_directory": "/srv/media/clips",
            "retention_hours": 72,
            "log_format": "json"
        }"#;
        let config = load_config_from_str(json).unwrap();
        assert_eq!(config.status_directory(), PathBuf::from("/srv/clipod/status"));
        assert_eq!(config.clips_directory(), PathBuf::from("/srv/media/clips"));
        assert_eq!(config.retention_hours, Some(72));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file() {
        clear_env();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clipod.json");
        std::fs::write(&path, r#"{"data_directory": "/data"}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.data_directory, "/data");
    }

    #[test]
    #[serial]
    fn test_missing_file_is_read_error() {
        clear_env();
        let result = load_config("/definitely/not/here/clipod.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    #[serial]
    fn test_invalid_json_is_parse_error() {
        clear_env();
        assert!(matches!(
            load_config_from_str("{ not json"),
            Err(ConfigError::ParseJson(_))
        ));
        assert!(matches!(
            load_config_from_str(r#"{"log_format": "yaml"}"#),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    #[serial]
    fn test_validation_errors() {
        clear_env();
        for json in [
            r#"{"data_directory": ""}"#,
            r#"{"status_directory": "  "}"#,
            r#"{"retention_hours": 0}"#,
            r#"{"status_directory": "/same", "clips_directory": "/same"}"#,
        ] {
            assert!(
                matches!(
                    load_config_from_str(json),
                    Err(ConfigError::Validation { .. })
                ),
                "expected validation error for {}",
                json
            );
        }
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_values() {
        clear_env();
        std::env::set_var(ENV_DATA_DIR, "/from/env");
        std::env::set_var(ENV_STATUS_DIR, "/from/env/records");
        std::env::set_var(ENV_LOG_FORMAT, "json");

        let config = load_config_from_str(r#"{"data_directory": "/from/file"}"#).unwrap();
        clear_env();

        assert_eq!(config.data_directory, "/from/env");
        assert_eq!(config.status_directory(), PathBuf::from("/from/env/records"));
        assert_eq!(config.clips_directory(), PathBuf::from("/from/env/clips"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_empty_env_value_ignored() {
        clear_env();
        std::env::set_var(ENV_DATA_DIR, "");
        let config = load_config_from_env().unwrap();
        clear_env();
        assert_eq!(config.data_directory, ".");
    }

    #[test]
    #[serial]
    fn test_bad_env_log_format() {
        clear_env();
        std::env::set_var(ENV_LOG_FORMAT, "xml");
        let result = load_config_from_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}

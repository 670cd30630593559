use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_directory")]
    pub data_directory: String,
    /// Job records. Defaults to `<data_directory>/status`.
    #[serde(default)]
    pub status_directory: Option<String>,
    /// Rendered clips. Defaults to `<data_directory>/clips`.
    #[serde(default)]
    pub clips_directory: Option<String>,
    /// Terminal jobs older than this are purged on request. Unset keeps
    /// every job for the life of the process.
    #[serde(default)]
    pub retention_hours: Option<u64>,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_data_directory() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            status_directory: None,
            clips_directory: None,
            retention_hours: None,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn status_directory(&self) -> PathBuf {
        match &self.status_directory {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_directory).join("status"),
        }
    }

    pub fn clips_directory(&self) -> PathBuf {
        match &self.clips_directory {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_directory).join("clips"),
        }
    }

    pub fn retention(&self) -> Option<chrono::Duration> {
        self.retention_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .map(chrono::Duration::hours)
    }
}

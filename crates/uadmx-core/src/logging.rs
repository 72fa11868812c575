//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this type only
//! describes where logs go and how long they are kept.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

const LOG_FILE_PREFIX: &str = "uadmx_";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level directive: trace, debug, info, warn or error
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a timestamped file in `log_directory`
    pub file_output: bool,
    pub log_directory: PathBuf,
    /// Number of log files kept by `cleanup_old_logs`
    pub max_files: usize,
    #[serde(skip)]
    started_at: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_files: 5,
            started_at: String::new(),
        }
    }
}

impl LogConfig {
    /// Parse the configured level, falling back to INFO
    pub fn parse_level(&self) -> tracing::Level {
        self.level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }

    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of this run's log file
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = if self.started_at.is_empty() {
            chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
        } else {
            self.started_at.clone()
        };
        self.log_directory
            .join(format!("{}{}.log", LOG_FILE_PREFIX, stamp))
    }

    /// Freeze the log file name so repeated calls agree
    pub fn start_session(&mut self) {
        self.started_at = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    }

    /// Delete the oldest log files, keeping `max_files`
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_directory.is_dir() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
            })
            .collect();

        if logs.len() <= self.max_files {
            return Ok(0);
        }

        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_files;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), tracing::Level::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), tracing::Level::DEBUG);

        config.level = "loud".to_string();
        assert_eq!(config.parse_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_current_log_path_is_stable() {
        let mut config = LogConfig::default();
        config.start_session();
        assert_eq!(config.current_log_path(), config.current_log_path());
        assert!(config.current_log_path().starts_with("logs"));
    }

    #[test]
    fn test_cleanup_old_logs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            fs::write(dir.path().join(format!("uadmx_2024010{}_000000.log", i)), "").unwrap();
        }
        fs::write(dir.path().join("other.txt"), "").unwrap();

        let config = LogConfig {
            log_directory: dir.path().to_path_buf(),
            max_files: 2,
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 2);
        assert!(!dir.path().join("uadmx_20240100_000000.log").exists());
        assert!(dir.path().join("uadmx_20240103_000000.log").exists());
        assert!(dir.path().join("other.txt").exists());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = serde_json::from_str(r#"{ "level": "warn" }"#).unwrap();
        assert_eq!(config.level, "warn");
        assert!(config.console_output);
    }
}

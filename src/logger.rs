//! Structured logging for the pricing engine
//!
//! - Log levels (ERROR, WARN, INFO, DEBUG, TRACE)
//! - Structured JSON logging for production
//! - Human-readable logging for development
//! - Daily files with size-based rotation
//! - Customer data redaction for ledger entries

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::config::LoggingConfig;

/// Log levels following RFC 5424
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn parse(level: &str) -> Self {
        match level.to_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Structured log entry
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub target: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub log_to_file: bool,
    pub log_to_stdout: bool,
    pub json_format: bool,
    pub max_file_size_mb: u64,
    pub max_log_files: u32,
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: LogLevel::parse(&config.level),
            log_to_file: config.log_to_file,
            log_to_stdout: config.log_to_stdout,
            json_format: config.json_format,
            max_file_size_mb: config.max_file_size_mb,
            max_log_files: config.max_log_files,
        }
    }
}

const REDACTED_KEYS: [&str; 4] = ["token", "secret", "password", "email"];

pub struct Logger {
    config: LoggerConfig,
    log_dir: PathBuf,
    current_file: Mutex<Option<BufWriter<File>>>,
    current_file_size: Mutex<u64>,
}

impl Logger {
    pub fn init(data_dir: &Path, config: LoggerConfig) -> Result<Self, String> {
        let log_dir = data_dir.join("logs");

        std::fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;

        let logger = Self {
            config,
            log_dir,
            current_file: Mutex::new(None),
            current_file_size: Mutex::new(0),
        };

        if logger.config.log_to_file {
            logger.rotate_logs()?;
        }

        Ok(logger)
    }

    fn dated_path(&self, suffix: Option<u32>) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d");
        match suffix {
            Some(n) => self.log_dir.join(format!("pricing-{}.{}.log", date, n)),
            None => self.log_dir.join(format!("pricing-{}.log", date)),
        }
    }

    /// Rotate today's file once it exceeds the size limit, then reopen it
    fn rotate_logs(&self) -> Result<(), String> {
        let log_path = self.dated_path(None);

        if log_path.exists() {
            let file_size = std::fs::metadata(&log_path)
                .map_err(|e| format!("Failed to read log file metadata: {}", e))?
                .len();

            if file_size >= self.config.max_file_size_mb * 1024 * 1024 {
                for i in (1..self.config.max_log_files).rev() {
                    let old_path = self.dated_path(Some(i));
                    if old_path.exists() {
                        let _ = std::fs::rename(&old_path, self.dated_path(Some(i + 1)));
                    }
                }

                let _ = std::fs::rename(&log_path, self.dated_path(Some(1)));

                let oldest_path = self.dated_path(Some(self.config.max_log_files));
                if oldest_path.exists() {
                    let _ = std::fs::remove_file(&oldest_path);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        *self.current_file.lock().map_err(|_| "Log file lock poisoned")? =
            Some(BufWriter::new(file));
        *self.current_file_size.lock().map_err(|_| "Log size lock poisoned")? = file_size;

        Ok(())
    }

    fn format_line(&self, entry: &LogEntry) -> String {
        if self.config.json_format {
            serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "{} [{}] [{}] {}{}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.target,
                entry.message,
                entry.data.as_ref().map(|d| format!(" | {}", d)).unwrap_or_default(),
                entry.error.as_ref().map(|e| format!(" | error: {}", e)).unwrap_or_default()
            )
        }
    }

    fn write(&self, entry: &LogEntry) {
        if entry.level > self.config.level {
            return;
        }

        let log_line = self.format_line(entry);

        if self.config.log_to_stdout {
            match entry.level {
                LogLevel::Error | LogLevel::Warn => eprintln!("{}", log_line),
                _ => println!("{}", log_line),
            }
        }

        if self.config.log_to_file {
            let needs_rotation = self
                .current_file_size
                .lock()
                .map(|size| *size >= self.config.max_file_size_mb * 1024 * 1024)
                .unwrap_or(false);
            if needs_rotation {
                let _ = self.rotate_logs();
            }

            if let Ok(mut guard) = self.current_file.lock() {
                if let Some(writer) = guard.as_mut() {
                    let _ = writeln!(writer, "{}", log_line);
                    let _ = writer.flush();

                    if let Ok(mut size) = self.current_file_size.lock() {
                        *size += log_line.len() as u64 + 1;
                    }
                }
            }
        }
    }

    fn entry(
        level: LogLevel,
        target: &'static str,
        message: &str,
        data: Option<serde_json::Value>,
        error: Option<&str>,
    ) -> LogEntry {
        LogEntry {
            timestamp: Local::now(),
            level,
            target,
            message: message.to_string(),
            data,
            error: error.map(String::from),
        }
    }

    pub fn error(&self, target: &'static str, message: &str, error: Option<&str>) {
        self.write(&Self::entry(LogLevel::Error, target, message, None, error));
    }

    pub fn warn(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Warn, target, message, data, None));
    }

    pub fn info(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Info, target, message, data, None));
    }

    pub fn debug(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Debug, target, message, data, None));
    }

    /// Log a points ledger movement with customer data redacted
    pub fn ledger(&self, action: &str, data: &serde_json::Value) {
        let redacted = redact_sensitive_data(data.clone());
        self.write(&Self::entry(LogLevel::Info, "POINTS", action, Some(redacted), None));
    }
}

/// Replace values of sensitive keys anywhere in a JSON document
pub fn redact_sensitive_data(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if REDACTED_KEYS.iter().any(|k| lower.contains(k)) {
                        (key, serde_json::Value::String("***REDACTED***".to_string()))
                    } else {
                        (key, redact_sensitive_data(val))
                    }
                })
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(redact_sensitive_data).collect())
        }
        other => other,
    }
}

static GLOBAL_LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Initialize the global logger from the application config
pub fn init_global_logger(data_dir: &Path, config: &LoggingConfig) -> Result<(), String> {
    let logger = Logger::init(data_dir, LoggerConfig::from(config))?;

    GLOBAL_LOGGER
        .set(Mutex::new(logger))
        .map_err(|_| "Logger already initialized")?;

    Ok(())
}

pub fn get_logger() -> Option<&'static Mutex<Logger>> {
    GLOBAL_LOGGER.get()
}

#[macro_export]
macro_rules! log_error {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.error($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $err:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let err_text: String = $err.to_string();
                l.error($target, $msg, Some(&err_text));
            }
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.warn($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.warn($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.info($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.info($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.debug($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.debug($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_ledger {
    ($action:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.ledger($action, $data);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redaction_is_recursive() {
        let value = json!({
            "customer_id": "c1",
            "customer_email": "a@b.c",
            "nested": [{ "session_token": "t" , "points": 10 }]
        });
        let redacted = redact_sensitive_data(value);
        assert_eq!(redacted["customer_id"], "c1");
        assert_eq!(redacted["customer_email"], "***REDACTED***");
        assert_eq!(redacted["nested"][0]["session_token"], "***REDACTED***");
        assert_eq!(redacted["nested"][0]["points"], 10);
    }

    #[test]
    fn test_level_parse_defaults_to_error() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("nonsense"), LogLevel::Error);
        assert!(LogLevel::Warn < LogLevel::Info);
    }
}

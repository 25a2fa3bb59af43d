//! Leveled processing reports.
//!
//! Every resolution and walk operation writes diagnostics into a
//! [`ProcessingReport`]. Two thresholds govern behavior: messages below the
//! log threshold are dropped, and messages at or above the exception
//! threshold convert into a [`CoreError::Message`] instead of being
//! recorded. The same failure can therefore be either recorded or thrown
//! purely based on caller configuration.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// Message severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingMessage {
    pub level: LogLevel,
    pub text: String,
}

impl fmt::Display for ProcessingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.text)
    }
}

/// A mutable diagnostic sink with leveled severities and an exception
/// threshold.
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    messages: Vec<ProcessingMessage>,
    log_level: LogLevel,
    exception_threshold: LogLevel,
}

impl Default for ProcessingReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingReport {
    /// A report recording `info` and above, throwing only on `fatal`.
    pub fn new() -> Self {
        Self::with_thresholds(LogLevel::Info, LogLevel::Fatal)
    }

    /// A report with explicit log and exception thresholds.
    pub fn with_thresholds(log_level: LogLevel, exception_threshold: LogLevel) -> Self {
        ProcessingReport {
            messages: Vec::new(),
            log_level,
            exception_threshold,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn exception_threshold(&self) -> LogLevel {
        self.exception_threshold
    }

    /// Log a message at the given level.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Message` when `level` is at or above the
    /// exception threshold; the message is not recorded in that case.
    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) -> Result<(), CoreError> {
        let message = ProcessingMessage {
            level,
            text: text.into(),
        };
        if level >= self.exception_threshold {
            return Err(CoreError::Message(message));
        }
        if level >= self.log_level {
            self.messages.push(message);
        }
        Ok(())
    }

    pub fn debug(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        self.log(LogLevel::Debug, text)
    }

    pub fn info(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        self.log(LogLevel::Info, text)
    }

    pub fn warn(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        self.log(LogLevel::Warning, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        self.log(LogLevel::Error, text)
    }

    /// Record a message without consulting the exception threshold.
    ///
    /// Used where the caller is about to return a typed error and the
    /// report entry only mirrors it; throwing here would shadow the typed
    /// failure.
    pub fn record(&mut self, level: LogLevel, text: impl Into<String>) {
        if level >= self.log_level {
            self.messages.push(ProcessingMessage {
                level,
                text: text.into(),
            });
        }
    }

    /// Merge another report's messages into this one, through the same
    /// threshold-aware path as [`log`](Self::log). Severity information is
    /// preserved.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Message` if a merged message trips this report's
    /// exception threshold.
    pub fn merge(&mut self, other: &ProcessingReport) -> Result<(), CoreError> {
        self.replay(&other.messages)
    }

    pub(crate) fn replay(&mut self, messages: &[ProcessingMessage]) -> Result<(), CoreError> {
        for message in messages {
            self.log(message.level, message.text.clone())?;
        }
        Ok(())
    }

    /// The recorded messages, in order.
    pub fn messages(&self) -> &[ProcessingMessage] {
        &self.messages
    }

    pub(crate) fn into_messages(self) -> Vec<ProcessingMessage> {
        self.messages
    }

    /// True when nothing at `error` or above was recorded.
    pub fn is_success(&self) -> bool {
        self.messages.iter().all(|m| m.level < LogLevel::Error)
    }

    /// The report as a JSON array of messages.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.messages).unwrap_or_default()
    }
}

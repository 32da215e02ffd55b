//! Minimal logging abstraction for the bootstrap phase, kept separate from
//! the engine's own `tracing` usage so bootstrap failures (bad CLI args,
//! config file missing) can be reported before a subscriber is even
//! installed.

pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Routes bootstrap messages through `tracing`, under the `"bootstrap"`
/// target, so they appear in whatever subscriber the host installs.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        ConsoleLogger::with_prefix("bootstrap")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        ConsoleLogger { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        ConsoleLogger::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

/// Discards everything. Used where a `BootstrapLogger` is required but
/// output would just be test noise.
pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
pub struct CapturingLogger {
    messages: std::sync::Mutex<Vec<(LogLevel, String)>>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[cfg(test)]
impl CapturingLogger {
    pub fn new() -> Self {
        CapturingLogger { messages: std::sync::Mutex::new(Vec::new()) }
    }

    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl BootstrapLogger for CapturingLogger {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push((LogLevel::Error, message.to_string()));
    }
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push((LogLevel::Warn, message.to_string()));
    }
    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push((LogLevel::Info, message.to_string()));
    }
    fn debug(&self, message: &str) {
        self.messages.lock().unwrap().push((LogLevel::Debug, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_logger_does_not_panic() {
        ConsoleLogger::new().info("hello");
    }

    #[test]
    fn noop_logger_discards_everything() {
        let logger = NoOpLogger;
        logger.error("x");
        logger.warn("x");
        logger.info("x");
        logger.debug("x");
    }

    #[test]
    fn capturing_logger_records_level_and_message() {
        let logger = CapturingLogger::new();
        logger.warn("careful");
        let messages = logger.messages();
        assert_eq!(messages, vec![(LogLevel::Warn, "careful".to_string())]);
    }
}

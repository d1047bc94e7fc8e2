use std::sync::Mutex;

use anyhow::anyhow;

/// Process-wide diagnostic sink. Deliberately peripheral: nothing in the
/// locator/walker/evaluator depends on what a `Logger` does with a message,
/// only that recoverable errors get reported somewhere before being
/// swallowed.
pub trait Logger: Clone {
    fn log(&self, message: impl Into<String>);
    fn warn(&self, message: impl Into<String>) {
        self.log(format!("WARN: {}", message.into()));
    }
    fn error(&self, message: impl Into<String>) {
        self.log(format!("ERROR: {}", message.into()));
    }
}

impl<T: Logger> Logger for &T {
    fn log(&self, message: impl Into<String>) {
        (*self).log(message);
    }
}

/// Writes to stderr; stdout is reserved for the JSON response.
pub struct StdioLogger {
    zero_time: std::time::Instant,
}
impl Logger for &StdioLogger {
    fn log(&self, message: impl Into<String>) {
        let delta_time = std::time::Instant::now().duration_since(self.zero_time);
        eprintln!("[{:.04}] {}", delta_time.as_secs_f64(), message.into());
    }
}
impl StdioLogger {
    pub fn new() -> Self {
        Self {
            zero_time: std::time::Instant::now(),
        }
    }
}
impl Default for StdioLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects messages for tests that assert a recoverable condition was
/// actually reported (not just silently dropped).
pub struct VecLogger {
    logs: Mutex<Vec<String>>,
}

impl Logger for &VecLogger {
    fn log(&self, message: impl Into<String>) {
        self.logs
            .lock()
            .expect("locking the logger array should not fail!")
            .push(message.into());
    }
}
impl VecLogger {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Copies out the logs so far without clearing them.
    pub fn snapshot(&self) -> Vec<String> {
        self.logs
            .lock()
            .expect("locking the logger array should not fail!")
            .clone()
    }

    pub fn get_logs(self) -> Result<Vec<String>, anyhow::Error> {
        self.logs
            .try_lock()
            .map_err(|err| anyhow!("error unlocking VecLogger logs:{err}"))
            .map(|mut x| x.drain(0..).collect::<Vec<_>>())
    }
}
impl Default for VecLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vec_logger_collects_warn_and_error_prefixes() {
        let logger = VecLogger::new();
        (&logger).log("plain");
        (&logger).warn("careful");
        (&logger).error("broken");

        assert_eq!(
            logger.snapshot(),
            vec![
                "plain".to_string(),
                "WARN: careful".to_string(),
                "ERROR: broken".to_string(),
            ]
        );
    }
}

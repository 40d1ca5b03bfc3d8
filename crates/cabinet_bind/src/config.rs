//! Bridge configuration.

use std::time::Duration;

/// Configuration of the worker pool that runs async opens.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Number of worker threads.
    pub workers: usize,

    /// Name given to worker threads.
    pub thread_name: String,

    /// How long an idle worker thread lingers before exiting.
    pub keep_alive: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name: "cabinet-worker".to_string(),
            keep_alive: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads. Zero is raised to one.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the idle keep-alive of worker threads.
    #[must_use]
    pub const fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.thread_name, "cabinet-worker");
        assert_eq!(config.keep_alive, Duration::from_secs(10));
    }

    #[test]
    fn builder_pattern() {
        let config = BridgeConfig::new()
            .workers(0)
            .thread_name("opens")
            .keep_alive(Duration::from_millis(50));

        assert_eq!(config.workers, 1);
        assert_eq!(config.thread_name, "opens");
        assert_eq!(config.keep_alive, Duration::from_millis(50));
    }
}

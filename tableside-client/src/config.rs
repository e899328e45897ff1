//! Client configuration

use std::time::Duration;

/// Client configuration for connecting to the sync server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3030")
    pub base_url: String,

    /// Commit request timeout
    pub timeout: Duration,

    /// TCP connect timeout (commits and listeners)
    pub connect_timeout: Duration,

    /// Buffered feed events per listener
    pub feed_buffer: usize,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            feed_buffer: 16,
        }
    }

    /// Set the commit timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-listener buffer size
    pub fn with_feed_buffer(mut self, feed_buffer: usize) -> Self {
        self.feed_buffer = feed_buffer.max(1);
        self
    }

    /// Base URL without trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3030")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://10.0.0.2:3030/")
            .with_timeout(Duration::from_secs(3))
            .with_feed_buffer(0);
        assert_eq!(config.base(), "http://10.0.0.2:3030");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.feed_buffer, 1);
    }
}

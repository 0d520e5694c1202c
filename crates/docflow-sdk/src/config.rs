use serde::{Deserialize, Serialize};

/// Connection settings for a docflow session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Buffer size of each change feed channel.
    pub feed_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 28015,
            database: "test".into(),
            feed_capacity: 1024,
        }
    }
}

impl SessionConfig {
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = name.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

//! Configuration for Qooil
//!
//! Centralized configuration with sensible defaults. The server clones one
//! snapshot per session; nothing here is shared mutable state.

use std::path::PathBuf;

/// Default TCP port
pub const DEFAULT_PORT: u16 = 7070;

/// Main configuration for a Qooil instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Address to bind (server) or connect to (client)
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Worker thread-pool size; also bounds concurrent sessions
    pub workers: usize,

    // -------------------------------------------------------------------------
    // Protocol Limits
    // -------------------------------------------------------------------------
    /// Longest path field accepted in a request, advertised via Info
    pub max_name: u64,

    /// Longest virtual path the server will report, advertised via Info
    pub max_path: u64,

    // -------------------------------------------------------------------------
    // Filesystem Configuration
    // -------------------------------------------------------------------------
    /// Directory served as the sandbox root; the process working directory
    /// when unset
    pub root_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            workers: 4,
            max_name: 255,
            max_path: 4096,
            root_dir: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The `host:port` string for bind/connect
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn max_name(mut self, max_name: u64) -> Self {
        self.config.max_name = max_name;
        self
    }

    pub fn max_path(mut self, max_path: u64) -> Self {
        self.config.max_path = max_path;
        self
    }

    pub fn root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = Some(root_dir.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

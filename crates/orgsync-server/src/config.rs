//! Server configuration.

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
        }
    }
}

impl ServerConfig {
    /// Build a config from `ORGSYNC_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("ORGSYNC_BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

//! Configuration management for modmap

use serde::{Deserialize, Serialize};

/// Main configuration for the modmap service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Project scan configuration
    pub project: ProjectConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3789,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Include/exclude glob masks applied to project-relative paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Glob patterns a file must match to be enumerated
    pub include_mask: Vec<String>,

    /// Glob patterns that exclude a file even when included
    pub exclude_mask: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            include_mask: vec![
                "**/*.js".to_string(),
                "**/*.jsx".to_string(),
                "**/*.ts".to_string(),
                "**/*.tsx".to_string(),
            ],
            exclude_mask: vec!["**/node_modules/**".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_masks_cover_the_module_family() {
        let config = ProjectConfig::default();
        assert!(config.include_mask.iter().any(|m| m.ends_with("*.ts")));
        assert!(config.include_mask.iter().any(|m| m.ends_with("*.jsx")));
        assert_eq!(config.exclude_mask, vec!["**/node_modules/**"]);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.project.include_mask, config.project.include_mask);
    }
}

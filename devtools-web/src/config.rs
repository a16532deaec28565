//! Application configuration: TOML file plus environment overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use devtools_toolbox::ToolboxConfig;
use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DEVTOOLS_CONFIG";

/// Configuration file picked up from the working directory when present.
pub const DEFAULT_CONFIG_PATH: &str = "devtools.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub timeouts: TimeoutConfig,
    pub toolbox: ToolboxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker threads; one per CPU when unset.
    pub workers: Option<usize>,
    /// Serve plain HTTP even when TLS files are configured.
    pub dev_mode: bool,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
            dev_mode: false,
            tls_cert: None,
            tls_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            file_prefix: "devtools-web.log".to_string(),
        }
    }
}

/// Request timeouts per tool, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub ip_analysis_secs: u64,
    pub batch_secs: u64,
    pub dns_lookup_secs: u64,
    pub performance_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ip_analysis_secs: 15,
            batch_secs: 60,
            dns_lookup_secs: 30,
            performance_secs: 45,
        }
    }
}

impl TimeoutConfig {
    pub fn ip_analysis(&self) -> Duration {
        Duration::from_secs(self.ip_analysis_secs)
    }

    pub fn batch(&self) -> Duration {
        Duration::from_secs(self.batch_secs)
    }

    pub fn dns_lookup(&self) -> Duration {
        Duration::from_secs(self.dns_lookup_secs)
    }

    pub fn performance(&self) -> Duration {
        Duration::from_secs(self.performance_secs)
    }
}

impl AppConfig {
    /// Load from `$DEVTOOLS_CONFIG`, else `./devtools.toml` if it exists,
    /// else defaults; then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from).or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `SERVER_HOST`, `SERVER_PORT` and `ENV=dev` win over the file.
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(host) = lookup("SERVER_HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = lookup("SERVER_PORT").filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid SERVER_PORT: {port}"))?;
        }
        if lookup("ENV").is_some_and(|env| env.eq_ignore_ascii_case("dev")) {
            self.server.dev_mode = true;
        }
        Ok(())
    }

    /// TLS cert and key paths when HTTPS should be served.
    pub fn tls_files(&self) -> Option<(&Path, &Path)> {
        if self.server.dev_mode {
            return None;
        }
        match (&self.server.tls_cert, &self.server.tls_key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.toolbox.max_batch_size, 100);
        assert_eq!(config.timeouts.batch(), Duration::from_secs(60));
    }

    #[test]
    fn test_sections_parse() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9443
            workers = 2
            tls_cert = "/etc/devtools/cert.pem"
            tls_key = "/etc/devtools/key.pem"

            [logging]
            format = "json"
            log_dir = "/var/log/devtools"

            [timeouts]
            batch_secs = 20

            [toolbox]
            batch_concurrency = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.timeouts.batch_secs, 20);
        assert_eq!(config.timeouts.dns_lookup_secs, 30);
        assert_eq!(config.toolbox.batch_concurrency, 4);
        assert!(config.tls_files().is_some());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(AppConfig::from_toml_str("[logging]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env_from(&[
                ("SERVER_HOST", "127.0.0.1"),
                ("SERVER_PORT", "3000"),
            ]))
            .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.dev_mode);
    }

    #[test]
    fn test_invalid_port_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(env_from(&[("SERVER_PORT", "eighty")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_dev_mode_disables_tls() {
        let mut config = AppConfig::from_toml_str(
            "[server]\ntls_cert = \"cert.pem\"\ntls_key = \"key.pem\"",
        )
        .unwrap();
        assert!(config.tls_files().is_some());

        config
            .apply_env_overrides(env_from(&[("ENV", "dev")]))
            .unwrap();
        assert!(config.server.dev_mode);
        assert!(config.tls_files().is_none());
    }

    #[test]
    fn test_tls_requires_both_files() {
        let config = AppConfig::from_toml_str("[server]\ntls_cert = \"cert.pem\"").unwrap();
        assert!(config.tls_files().is_none());
    }
}

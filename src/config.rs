use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub printer: PrinterConfig,
    pub mode: RunMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrinterConfig {
    pub device_path: PathBuf,
    pub use_mock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }

    /// Device error details only leave the process outside production.
    pub fn exposes_error_detail(&self) -> bool {
        matches!(self, RunMode::Development)
    }
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            _ => Err(ConfigError::InvalidRunMode {
                value: s.to_string(),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "3001".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            shutdown_timeout_secs: {
                let raw = lookup("SHUTDOWN_TIMEOUT_SECS").unwrap_or_else(|| "10".to_string());
                raw.parse()
                    .map_err(|_| ConfigError::InvalidShutdownTimeout { value: raw })?
            },
        };

        let printer = PrinterConfig {
            device_path: lookup("PRINTER_DEVICE")
                .unwrap_or_else(|| "/dev/usb/lp0".to_string())
                .into(),
            use_mock: lookup("USE_MOCK_PRINTER")
                .unwrap_or_else(|| "false".to_string())
                .parse()
                .unwrap_or(false),
        };

        let mode = lookup("RUN_MODE")
            .unwrap_or_else(|| "development".to_string())
            .parse()?;

        let config = Config {
            server,
            printer,
            mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Validate port range
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| ConfigError::InvalidPort)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

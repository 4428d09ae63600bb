pub mod toml_config;

pub use toml_config::{ConsoleConfig, NotifyMode};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "dispatch-console")]
#[command(about = "Real-time backend for the emergency-call operator dashboard demo")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Destination number reported for simulated calls
    #[arg(long, env = "CONSOLE_PHONE_NUMBER")]
    pub phone_number: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔 (若有)，再套用命令列覆蓋
    pub fn load(&self) -> Result<ConsoleConfig> {
        let mut config = match &self.config {
            Some(path) => ConsoleConfig::from_file(path)?,
            None => ConsoleConfig::default(),
        };

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(number) = &self.phone_number {
            config.console.phone_number = Some(number.clone());
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = CliConfig::parse_from([
            "dispatch-console",
            "--host",
            "127.0.0.1",
            "--port",
            "4000",
            "--phone-number",
            "+15550001111",
        ]);

        let config = cli.load().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.console.phone_number.as_deref(), Some("+15550001111"));
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let cli = CliConfig::parse_from(["dispatch-console", "--config", "/nonexistent/console.toml"]);
        assert!(cli.load().is_err());
    }
}

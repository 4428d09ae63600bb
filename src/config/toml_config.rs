use crate::core::scenario::Scenario;
use crate::domain::model::{ResponseWindow, ServiceType};
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub server: ServerConfig,
    pub console: ConsoleSection,
    pub services: ServicesConfig,
    pub dispatch: DispatchConfig,
    pub playback: PlaybackConfig,
    pub transcript: TranscriptConfig,
    pub tips: TipsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allow_any: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_allow_any: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    /// 模擬來電的受話號碼
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub units: u32,
    pub response_min_minutes: u32,
    pub response_max_minutes: u32,
}

impl ServiceConfig {
    pub fn response_window(&self) -> ResponseWindow {
        ResponseWindow {
            min_minutes: self.response_min_minutes,
            max_minutes: self.response_max_minutes,
        }
    }
}

/// Fields left out of a `[services.*]` table keep that service's own default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ServicesOverrides")]
pub struct ServicesConfig {
    pub police: ServiceConfig,
    pub ems: ServiceConfig,
    pub fire: ServiceConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceOverride {
    units: Option<u32>,
    response_min_minutes: Option<u32>,
    response_max_minutes: Option<u32>,
}

impl ServiceOverride {
    fn apply(self, base: ServiceConfig) -> ServiceConfig {
        ServiceConfig {
            units: self.units.unwrap_or(base.units),
            response_min_minutes: self.response_min_minutes.unwrap_or(base.response_min_minutes),
            response_max_minutes: self.response_max_minutes.unwrap_or(base.response_max_minutes),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServicesOverrides {
    police: ServiceOverride,
    ems: ServiceOverride,
    fire: ServiceOverride,
}

impl From<ServicesOverrides> for ServicesConfig {
    fn from(overrides: ServicesOverrides) -> Self {
        let defaults = ServicesConfig::default();
        Self {
            police: overrides.police.apply(defaults.police),
            ems: overrides.ems.apply(defaults.ems),
            fire: overrides.fire.apply(defaults.fire),
        }
    }
}

impl ServicesConfig {
    pub fn get(&self, service: ServiceType) -> &ServiceConfig {
        match service {
            ServiceType::Police => &self.police,
            ServiceType::Ems => &self.ems,
            ServiceType::Fire => &self.fire,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            police: ServiceConfig {
                units: 5,
                response_min_minutes: 3,
                response_max_minutes: 5,
            },
            ems: ServiceConfig {
                units: 3,
                response_min_minutes: 2,
                response_max_minutes: 4,
            },
            fire: ServiceConfig {
                units: 2,
                response_min_minutes: 4,
                response_max_minutes: 6,
            },
        }
    }
}

/// Who hears about a dispatch and its arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    #[default]
    Broadcast,
    Requester,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub notify: NotifyMode,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 30,
            max_delay_secs: 60,
            notify: NotifyMode::Broadcast,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub interval_secs: u64,
    pub default_scenario: String,
}

impl PlaybackConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            default_scenario: "suicide".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub max_entries: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self { max_entries: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TipsConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TipsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

impl TipsConfig {
    /// 取得實際可用的 API key；未替換的 `${VAR}` 視為未設定
    pub fn resolved_api_key(&self) -> Option<String> {
        let key = match &self.api_key {
            Some(key) => key.clone(),
            None => std::env::var(API_KEY_ENV).ok()?,
        };
        let key = key.trim().to_string();
        if key.is_empty() || key.starts_with("${") {
            None
        } else {
            Some(key)
        }
    }
}

impl ConsoleConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConsoleError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConsoleError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GOOGLE_GEMINI_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConsoleError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_positive_number("dispatch.min_delay_secs", self.dispatch.min_delay_secs, 1)?;
        validation::validate_ordered(
            "dispatch.delay_secs",
            self.dispatch.min_delay_secs,
            self.dispatch.max_delay_secs,
            true,
        )?;
        validation::validate_positive_number("playback.interval_secs", self.playback.interval_secs, 1)?;
        validation::validate_positive_number(
            "transcript.max_entries",
            self.transcript.max_entries as u64,
            1,
        )?;

        for service in ServiceType::ALL {
            let settings = self.services.get(service);
            validation::validate_ordered(
                &format!("services.{}.response_minutes", service),
                settings.response_min_minutes,
                settings.response_max_minutes,
                false,
            )?;
        }

        if self.playback.default_scenario.parse::<Scenario>().is_err() {
            return Err(ConsoleError::InvalidConfigValueError {
                field: "playback.default_scenario".to_string(),
                value: self.playback.default_scenario.clone(),
                reason: format!("Known scenarios: {}", Scenario::keys().join(", ")),
            });
        }

        validation::validate_url("tips.endpoint", &self.tips.endpoint)?;
        validation::validate_non_empty_string("tips.model", &self.tips.model)?;

        if let Some(number) = &self.console.phone_number {
            validation::validate_non_empty_string("console.phone_number", number)?;
        }

        Ok(())
    }

    pub fn default_scenario(&self) -> Scenario {
        self.playback.default_scenario.parse().unwrap_or_default()
    }
}

impl Validate for ConsoleConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ConsoleConfig::from_toml_str("").unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.services.police.units, 5);
        assert_eq!(config.services.ems.units, 3);
        assert_eq!(config.services.fire.units, 2);
        assert_eq!(config.dispatch.min_delay_secs, 30);
        assert_eq!(config.dispatch.max_delay_secs, 60);
        assert_eq!(config.dispatch.notify, NotifyMode::Broadcast);
        assert_eq!(config.playback.interval(), Duration::from_secs(3));
        assert_eq!(config.transcript.max_entries, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
port = 8080

[services.ems]
units = 1
response_min_minutes = 1
response_max_minutes = 2

[dispatch]
notify = "requester"

[playback]
default_scenario = "medical"
"#;

        let config = ConsoleConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.services.ems.units, 1);
        assert_eq!(config.services.police.units, 5);
        assert_eq!(config.dispatch.notify, NotifyMode::Requester);
        assert_eq!(config.default_scenario(), Scenario::Medical);
    }

    #[test]
    fn test_service_section_with_units_only() {
        let toml_content = r#"
[services.ems]
units = 4

[services.fire]
response_max_minutes = 8
"#;

        let config = ConsoleConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.services.ems.units, 4);
        assert_eq!(config.services.ems.response_min_minutes, 2);
        assert_eq!(config.services.ems.response_max_minutes, 4);
        assert_eq!(config.services.fire.units, 2);
        assert_eq!(config.services.fire.response_min_minutes, 4);
        assert_eq!(config.services.fire.response_max_minutes, 8);
        assert_eq!(config.services.police.units, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DISPATCH_CONSOLE_TEST_KEY", "secret-key");

        let toml_content = r#"
[tips]
api_key = "${DISPATCH_CONSOLE_TEST_KEY}"
"#;

        let config = ConsoleConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.tips.resolved_api_key().as_deref(), Some("secret-key"));

        std::env::remove_var("DISPATCH_CONSOLE_TEST_KEY");
    }

    #[test]
    fn test_unresolved_api_key_counts_as_missing() {
        let toml_content = r#"
[tips]
api_key = "${DISPATCH_CONSOLE_UNSET_VARIABLE}"
"#;

        let config = ConsoleConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.tips.resolved_api_key(), None);
    }

    #[test]
    fn test_config_validation() {
        let inverted_delay = r#"
[dispatch]
min_delay_secs = 60
max_delay_secs = 30
"#;
        let config = ConsoleConfig::from_toml_str(inverted_delay).unwrap();
        assert!(config.validate().is_err());

        let unknown_scenario = r#"
[playback]
default_scenario = "earthquake"
"#;
        let config = ConsoleConfig::from_toml_str(unknown_scenario).unwrap();
        assert!(config.validate().is_err());

        let bad_endpoint = r#"
[tips]
endpoint = "not a url"
"#;
        let config = ConsoleConfig::from_toml_str(bad_endpoint).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[console]
phone_number = "+15550009999"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = ConsoleConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.console.phone_number.as_deref(), Some("+15550009999"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = ConsoleConfig::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(ConsoleError::ConfigError { .. })));
    }
}

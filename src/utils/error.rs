use crate::domain::model::ServiceType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("No {service} units available")]
    ServiceUnavailable { service: ServiceType },

    #[error("Invalid service type: {value}")]
    InvalidServiceType { value: String },

    #[error("Call not found: {call_id}")]
    CallNotFound { call_id: String },

    #[error("External service failure: {message}")]
    ExternalServiceFailure { message: String },

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Simulation is no longer accepting commands")]
    SimulationClosed,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConsoleError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 預期中的結果，不算故障
            ConsoleError::ServiceUnavailable { .. } | ConsoleError::CallNotFound { .. } => {
                ErrorSeverity::Low
            }
            ConsoleError::InvalidServiceType { .. }
            | ConsoleError::UnknownCommand { .. }
            | ConsoleError::MissingField { .. }
            | ConsoleError::SerializationError(_) => ErrorSeverity::Medium,
            ConsoleError::ExternalServiceFailure { .. } | ConsoleError::HttpError(_) => {
                ErrorSeverity::Medium
            }
            ConsoleError::ConfigError { .. }
            | ConsoleError::InvalidConfigValueError { .. }
            | ConsoleError::MissingConfigError { .. } => ErrorSeverity::High,
            ConsoleError::SimulationClosed | ConsoleError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Races between call teardown and in-flight events produce these; callers
    /// swallow them instead of reporting a fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ConsoleError::ServiceUnavailable { .. } | ConsoleError::CallNotFound { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ConsoleError::ServiceUnavailable { service } => {
                format!("No {} units are available right now", service)
            }
            ConsoleError::InvalidServiceType { value } => {
                format!("'{}' is not a dispatchable service (police, ems, fire)", value)
            }
            ConsoleError::CallNotFound { call_id } => {
                format!("Call {} is no longer active", call_id)
            }
            ConsoleError::MissingField { field } => format!("The command is missing '{}'", field),
            ConsoleError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            ConsoleError::MissingConfigError { field } => {
                format!("Configuration value '{}' is required", field)
            }
            ConsoleError::ConfigError { message } => format!("Configuration problem: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_errors_are_low_severity() {
        let unavailable = ConsoleError::ServiceUnavailable {
            service: ServiceType::Ems,
        };
        let missing = ConsoleError::CallNotFound {
            call_id: "sim_1".to_string(),
        };

        assert!(unavailable.is_expected());
        assert!(missing.is_expected());
        assert_eq!(unavailable.severity(), ErrorSeverity::Low);
        assert_eq!(unavailable.to_string(), "No ems units available");
    }

    #[test]
    fn test_protocol_errors_are_not_expected() {
        let err = ConsoleError::InvalidServiceType {
            value: "coast_guard".to_string(),
        };
        assert!(!err.is_expected());
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("coast_guard"));
    }
}

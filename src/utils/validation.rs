use crate::utils::error::{ConsoleError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ConsoleError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ConsoleError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ConsoleError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ConsoleError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// `lower` must stay strictly below `upper` when `strict`, otherwise at most equal.
pub fn validate_ordered<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    lower: T,
    upper: T,
    strict: bool,
) -> Result<()> {
    let ok = if strict { lower < upper } else { lower <= upper };
    if !ok {
        return Err(ConsoleError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", lower, upper),
            reason: if strict {
                "Lower bound must be below upper bound".to_string()
            } else {
                "Lower bound must not exceed upper bound".to_string()
            },
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ConsoleError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConsoleError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("tips.endpoint", "https://example.com").is_ok());
        assert!(validate_url("tips.endpoint", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("tips.endpoint", "").is_err());
        assert!(validate_url("tips.endpoint", "invalid-url").is_err());
        assert!(validate_url("tips.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("playback.interval_secs", 3, 1).is_ok());
        assert!(validate_positive_number("playback.interval_secs", 0, 1).is_err());
    }

    #[test]
    fn test_validate_ordered() {
        assert!(validate_ordered("dispatch", 30, 60, true).is_ok());
        assert!(validate_ordered("dispatch", 60, 60, true).is_err());
        assert!(validate_ordered("services.ems", 2, 2, false).is_ok());
        assert!(validate_ordered("services.ems", 4, 2, false).is_err());
    }

    #[test]
    fn test_validate_required_and_non_empty() {
        let missing: Option<String> = None;
        assert!(validate_required_field("tips.api_key", &missing).is_err());
        assert!(validate_non_empty_string("console.phone_number", "   ").is_err());
        assert!(validate_non_empty_string("console.phone_number", "+15550000000").is_ok());
    }
}

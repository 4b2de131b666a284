use crate::utils::error::{MelodiqaError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| MelodiqaError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MelodiqaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Discord snowflakes are never zero.
pub fn validate_snowflake(field_name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(MelodiqaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Discord ids must be non-zero".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MelodiqaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        return Err(MelodiqaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_snowflake() {
        assert!(validate_snowflake("guild_id", 81384788765712384).is_ok());
        assert!(validate_snowflake("guild_id", 0).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("queue_frames", 50usize, 2, 1500).is_ok());
        assert!(validate_range("queue_frames", 1usize, 2, 1500).is_err());
        assert!(validate_range("queue_frames", 1501usize, 2, 1500).is_err());
    }

    #[test]
    fn test_validate_required_and_non_empty() {
        let missing: Option<String> = None;
        assert!(matches!(
            validate_required_field("token", &missing),
            Err(MelodiqaError::MissingConfigError { .. })
        ));
        assert!(validate_non_empty_string("token", "   ").is_err());
        assert!(validate_non_empty_string("token", "abc").is_ok());
    }

    #[test]
    fn test_validate_one_of() {
        assert!(validate_one_of("logging.level", "DEBUG", &["info", "debug"]).is_ok());
        assert!(validate_one_of("logging.level", "loud", &["info", "debug"]).is_err());
    }
}

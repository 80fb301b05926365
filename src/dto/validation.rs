//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted test type name.
const MAX_TEST_TYPE_LEN: usize = 48;

/// Validates that a test type is a lowercase slug usable as a storage key.
///
/// # Examples
///
/// ```ignore
/// validate_test_type("reaction-time") // Ok
/// validate_test_type("Reaction")      // Err - uppercase
/// validate_test_type("../etc")        // Err - invalid characters
/// ```
pub fn validate_test_type(test_type: &str) -> Result<(), ValidationError> {
    if test_type.is_empty() || test_type.len() > MAX_TEST_TYPE_LEN {
        let mut err = ValidationError::new("test_type_length");
        err.message = Some(
            format!(
                "Test type must be between 1 and {MAX_TEST_TYPE_LEN} characters (got {})",
                test_type.len()
            )
            .into(),
        );
        return Err(err);
    }

    let valid_chars = test_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_chars || test_type.starts_with('-') || test_type.ends_with('-') {
        let mut err = ValidationError::new("test_type_format");
        err.message = Some(
            "Test type must contain only lowercase letters, digits and inner dashes".into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_test_type_valid() {
        assert!(validate_test_type("reaction-time").is_ok());
        assert!(validate_test_type("audio2").is_ok());
    }

    #[test]
    fn test_validate_test_type_invalid_length() {
        assert!(validate_test_type("").is_err());
        assert!(validate_test_type(&"a".repeat(49)).is_err());
    }

    #[test]
    fn test_validate_test_type_invalid_format() {
        assert!(validate_test_type("Reaction").is_err()); // uppercase
        assert!(validate_test_type("../etc").is_err()); // path
        assert!(validate_test_type("-time").is_err()); // leading dash
        assert!(validate_test_type("reaction time").is_err()); // space
    }
}

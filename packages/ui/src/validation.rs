//! Client-side input validation for the onboarding and profile forms.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

pub const OTP_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_.]{3,20}$").unwrap());

/// Trim surrounding whitespace and lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and check the address has a non-empty local part and domain.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUsername)
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if (1..=MAX_NAME_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword)
    }
}

/// A one-time code is exactly [`OTP_LENGTH`] characters; its content is for
/// the backend to judge.
pub fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() == OTP_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::InvalidCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM \n"), "ana@example.com");
        assert_eq!(validate_email(" Ana@Example.com").unwrap(), "ana@example.com");
    }

    #[test]
    fn test_email_requires_at_sign() {
        assert_eq!(validate_email("ana.example.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("@example.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("ana@"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("   "), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_username_rules() {
        for ok in ["ana", "ana_b.c", "a1b2c3", "abcdefghijklmnopqrst"] {
            assert!(validate_username(ok).is_ok(), "{ok}");
        }
        for bad in ["ab", "Ana", "ana b", "ana-b", "abcdefghijklmnopqrstu", ""] {
            assert_eq!(validate_username(bad), Err(ValidationError::InvalidUsername), "{bad}");
        }
    }

    #[test]
    fn test_name_length() {
        assert!(validate_name("Ana").is_ok());
        assert!(validate_name(&"é".repeat(50)).is_ok());
        assert!(validate_name(&"a".repeat(51)).is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_password_and_otp() {
        assert!(validate_password("12345678").is_ok());
        assert_eq!(validate_password("1234567"), Err(ValidationError::WeakPassword));

        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("").is_err());
    }
}

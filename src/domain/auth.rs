//! Authentication payload primitives.
//!
//! Keep inbound payload parsing outside the services by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use std::fmt;

use zeroize::Zeroizing;

use super::credentials::{self, PasswordPolicyError};
use super::user::{Email, UserValidationError, Username};

/// Validation failures raised when assembling signup credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupValidationError {
    /// One or more of email/username/password was missing or blank.
    MissingFields,
    /// Email failed format validation.
    Email(UserValidationError),
    /// Username failed length or slug-form validation.
    Username(UserValidationError),
    /// Password failed the signup policy.
    Password(PasswordPolicyError),
}

impl fmt::Display for SignupValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields => write!(f, "Email, username, and password are required"),
            Self::Email(err) | Self::Username(err) => write!(f, "{err}"),
            Self::Password(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SignupValidationError {}

/// Validated signup payload.
///
/// ## Invariants
/// - `email` and `username` are canonical lowercase.
/// - `password` satisfies the signup policy but is still plaintext; it is
///   zeroised on drop and must be hashed before storage.
#[derive(Debug, Clone)]
pub struct SignupCredentials {
    email: Email,
    username: Username,
    password: Zeroizing<String>,
}

impl SignupCredentials {
    /// Construct credentials from raw email/username/password inputs.
    ///
    /// Checks run in a fixed order (presence, email format, username,
    /// password policy) and the first failure wins, so callers can surface
    /// one actionable message at a time.
    pub fn try_from_parts(
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, SignupValidationError> {
        if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
            return Err(SignupValidationError::MissingFields);
        }
        let email = Email::parse(email).map_err(SignupValidationError::Email)?;
        let username = Username::parse(username).map_err(SignupValidationError::Username)?;
        credentials::validate_password(password).map_err(SignupValidationError::Password)?;
        Ok(Self {
            email,
            username,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Canonical email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Canonical username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Plaintext password, policy-checked but not yet hashed.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validation failures raised when assembling login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email or password was missing.
    MissingFields,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields => write!(f, "Email and password are required"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login payload.
///
/// The email is lowercased but deliberately not format-checked: an address
/// that cannot match any account fails later as `InvalidCredentials`, which
/// keeps unknown-address and wrong-password responses indistinguishable.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() || password.is_empty() {
            return Err(LoginValidationError::MissingFields);
        }
        Ok(Self {
            email: normalized,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Lowercased email suitable for account lookups.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "ada", "Longenough1!")]
    #[case("a@b.co", "", "Longenough1!")]
    #[case("a@b.co", "ada", "")]
    fn signup_requires_all_fields(
        #[case] email: &str,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        let err = SignupCredentials::try_from_parts(email, username, password)
            .expect_err("missing fields must fail");
        assert_eq!(err, SignupValidationError::MissingFields);
    }

    #[test]
    fn signup_checks_run_in_order() {
        let err = SignupCredentials::try_from_parts("bad-email", "x", "short")
            .expect_err("email fails first");
        assert!(matches!(err, SignupValidationError::Email(_)));

        let err = SignupCredentials::try_from_parts("a@b.co", "x", "short")
            .expect_err("username fails before password");
        assert!(matches!(err, SignupValidationError::Username(_)));

        let err = SignupCredentials::try_from_parts("a@b.co", "ada", "short")
            .expect_err("password policy fails last");
        assert!(matches!(err, SignupValidationError::Password(_)));
    }

    #[test]
    fn signup_canonicalises_identity_fields() {
        let creds = SignupCredentials::try_from_parts("Ada@Example.com", "Ada-42", "Longenough1!")
            .expect("valid signup");
        assert_eq!(creds.email().as_str(), "ada@example.com");
        assert_eq!(creds.username().as_str(), "ada-42");
        assert_eq!(creds.password(), "Longenough1!");
    }

    #[rstest]
    #[case("  ADA@example.com  ", "pw", "ada@example.com")]
    #[case("x@y.z", "correct horse", "x@y.z")]
    fn login_lowercases_email(#[case] email: &str, #[case] password: &str, #[case] expected: &str) {
        let creds =
            LoginCredentials::try_from_parts(email, password).expect("valid inputs succeed");
        assert_eq!(creds.email(), expected);
        assert_eq!(creds.password(), password);
    }

    #[rstest]
    #[case("", "pw")]
    #[case("   ", "pw")]
    #[case("a@b.co", "")]
    fn login_requires_both_fields(#[case] email: &str, #[case] password: &str) {
        let err = LoginCredentials::try_from_parts(email, password)
            .expect_err("missing fields must fail");
        assert_eq!(err, LoginValidationError::MissingFields);
    }
}

//! User identity model.
//!
//! ## Invariants
//! - `Email` and `Username` always hold their canonical lowercase form.
//! - A [`User`] carries at least one credential (`password_hash` or
//!   `google_id`), and `auth_provider` reflects exactly which are present
//!   (`Both` iff both).

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::credentials::slugify;

/// Minimum allowed length for a username.
pub const USERNAME_MIN: usize = 3;
/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 30;

/// Validation errors returned by the identity newtype constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyEmail,
    InvalidEmail,
    UsernameLength,
    UsernameFormat,
    InvalidId,
    /// No credential present: a user needs a password or a federated id.
    MissingCredentials,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "Email is required"),
            Self::InvalidEmail => write!(f, "Invalid email format"),
            Self::UsernameLength => write!(
                f,
                "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
            ),
            Self::UsernameFormat => {
                write!(f, "Username can only contain letters, numbers, and hyphens")
            }
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::MissingCredentials => {
                write!(f, "account must have a password or a federated identity")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validate and construct a [`UserId`] from string input.
    pub fn parse(id: &str) -> Result<Self, UserValidationError> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let pattern = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Canonical lowercase email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and canonicalise an email address.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if !email_regex().is_match(trimmed) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Local part of the address (before the `@`).
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Canonical lowercase username in slug form.
///
/// 3 to 30 characters, `[a-z0-9-]` only, no leading/trailing or doubled
/// hyphens (the canonical form must survive slugification unchanged).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and canonicalise a username.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        let canonical = raw.trim().to_lowercase();
        let length = canonical.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
            return Err(UserValidationError::UsernameLength);
        }
        if slugify(&canonical) != canonical {
            return Err(UserValidationError::UsernameFormat);
        }
        Ok(Self(canonical))
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Which credential kinds an account carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Password only.
    Local,
    /// Federated identity only.
    Federated,
    /// Both a password and a federated identity.
    Both,
}

impl AuthProvider {
    /// Derive the provider from which credentials are present.
    pub fn from_presence(
        has_password: bool,
        has_federated: bool,
    ) -> Result<Self, UserValidationError> {
        match (has_password, has_federated) {
            (true, true) => Ok(Self::Both),
            (true, false) => Ok(Self::Local),
            (false, true) => Ok(Self::Federated),
            (false, false) => Err(UserValidationError::MissingCredentials),
        }
    }

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Federated => "federated",
            Self::Both => "both",
        }
    }

    /// Parse the stable storage representation.
    pub fn from_str_storage(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "federated" => Some(Self::Federated),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// Application user as held by the identity store.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    /// Bcrypt hash; `None` for federated-only accounts.
    pub password_hash: Option<String>,
    /// Identity provider subject identifier; `None` for local-only accounts.
    pub google_id: Option<String>,
    pub auth_provider: AuthProvider,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a local password is set.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Public projection: safe to serialise to any caller. Never carries
    /// the password hash or reset token.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Stable user identifier.
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: UserId,
    /// Canonical lowercase email.
    #[schema(value_type = String, example = "ada@example.com")]
    pub email: Email,
    /// Canonical lowercase username.
    #[schema(value_type = String, example = "ada-lovelace")]
    pub username: Username,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for identity newtypes.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  Ada@Example.COM ", "ada@example.com")]
    #[case("a@b.co", "a@b.co")]
    fn email_canonicalises(#[case] raw: &str, #[case] expected: &str) {
        let email = Email::parse(raw).expect("valid email");
        assert_eq!(email.as_str(), expected);
    }

    #[rstest]
    #[case("", UserValidationError::EmptyEmail)]
    #[case("not-an-email", UserValidationError::InvalidEmail)]
    #[case("a b@c.com", UserValidationError::InvalidEmail)]
    #[case("a@b", UserValidationError::InvalidEmail)]
    fn email_rejects_malformed_input(#[case] raw: &str, #[case] expected: UserValidationError) {
        let err = Email::parse(raw).expect_err("invalid email must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("Ada-Lovelace", "ada-lovelace")]
    #[case("user42", "user42")]
    #[case("abc", "abc")]
    fn username_canonicalises(#[case] raw: &str, #[case] expected: &str) {
        let username = Username::parse(raw).expect("valid username");
        assert_eq!(username.as_str(), expected);
    }

    #[rstest]
    #[case("ab", UserValidationError::UsernameLength)]
    #[case("", UserValidationError::UsernameLength)]
    #[case("a".repeat(31), UserValidationError::UsernameLength)]
    #[case("ada lovelace", UserValidationError::UsernameFormat)]
    #[case("ada_lovelace", UserValidationError::UsernameFormat)]
    #[case("-ada", UserValidationError::UsernameFormat)]
    #[case("ada--l", UserValidationError::UsernameFormat)]
    fn username_rejects_malformed_input(
        #[case] raw: impl AsRef<str>,
        #[case] expected: UserValidationError,
    ) {
        let err = Username::parse(raw.as_ref()).expect_err("invalid username must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case(true, true, AuthProvider::Both)]
    #[case(true, false, AuthProvider::Local)]
    #[case(false, true, AuthProvider::Federated)]
    fn provider_reflects_credential_presence(
        #[case] has_password: bool,
        #[case] has_federated: bool,
        #[case] expected: AuthProvider,
    ) {
        let provider = AuthProvider::from_presence(has_password, has_federated)
            .expect("at least one credential present");
        assert_eq!(provider, expected);
    }

    #[test]
    fn provider_requires_at_least_one_credential() {
        let err = AuthProvider::from_presence(false, false).expect_err("no credentials");
        assert_eq!(err, UserValidationError::MissingCredentials);
    }

    #[test]
    fn provider_storage_round_trips() {
        for provider in [AuthProvider::Local, AuthProvider::Federated, AuthProvider::Both] {
            assert_eq!(
                AuthProvider::from_str_storage(provider.as_str()),
                Some(provider)
            );
        }
        assert_eq!(AuthProvider::from_str_storage("oauth"), None);
    }
}

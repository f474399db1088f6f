//! Credential utilities: password policy, hashing, tokens, and slugs.
//!
//! Pure functions with no I/O. Services compose these; nothing here touches
//! a store or a clock beyond the OS random source.

use rand::Rng;
use rand::rngs::OsRng;
use thiserror::Error;

/// Fixed bcrypt cost factor for password hashing.
const HASH_COST: u32 = 12;

/// Symbol set accepted by the password policy.
const PASSWORD_SYMBOLS: &str = r##"!@#$%^&*()_+-=[]{};':"\|,.<>/?"##;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of generated password-reset tokens.
pub const RESET_TOKEN_LENGTH: usize = 64;

/// First failing password-policy rule, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    /// Fewer than eight characters.
    #[error("Password must be at least 8 characters long")]
    TooShort,
    /// No uppercase letter present.
    #[error("Password must contain at least 1 capital letter")]
    MissingUppercase,
    /// No digit present.
    #[error("Password must contain at least 1 number")]
    MissingDigit,
    /// No character from the accepted symbol set present.
    #[error("Password must contain at least 1 special character")]
    MissingSymbol,
}

/// Hashing failed inside the bcrypt primitive.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(#[from] bcrypt::BcryptError);

/// Check a candidate password against the signup policy.
///
/// Rules are evaluated in a fixed order (length, uppercase, digit, symbol)
/// and only the first failure is reported.
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    if password.chars().count() < 8 {
        return Err(PasswordPolicyError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(PasswordPolicyError::MissingSymbol);
    }
    Ok(())
}

/// Hash a plaintext password with a per-call random salt.
///
/// Two calls with the same plaintext yield different hash strings.
pub fn hash_password(plaintext: &str) -> Result<String, HashingError> {
    Ok(bcrypt::hash(plaintext, HASH_COST)?)
}

/// Verify a plaintext password against a stored hash.
///
/// A malformed hash is treated as a mismatch, never an error.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

/// Canonicalise free text into a URL-safe slug.
///
/// Lowercases and trims, collapses internal whitespace to single hyphens,
/// strips everything outside `[a-z0-9-]`, collapses repeated hyphens, and
/// strips leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut last_was_hyphen = false;
    for ch in lowered.chars() {
        let mapped = if ch.is_whitespace() { '-' } else { ch };
        let allowed = mapped.is_ascii_lowercase() || mapped.is_ascii_digit() || mapped == '-';
        if !allowed {
            continue;
        }
        if mapped == '-' {
            if last_was_hyphen {
                continue;
            }
            last_was_hyphen = true;
        } else {
            last_was_hyphen = false;
        }
        slug.push(mapped);
    }
    slug.trim_matches('-').to_owned()
}

/// Derive a list slug from a title plus a random base-36 suffix.
///
/// No uniqueness probe is performed here; callers rely on the storage unique
/// constraint, since a collision among six base-36 characters is negligible.
pub fn generate_unique_slug(title: &str) -> String {
    format!("{}-{}", slugify(title), random_suffix(6))
}

/// Generate a password-reset token: 64 characters drawn uniformly from
/// `[A-Za-z0-9]` using the OS random source.
pub fn generate_reset_token() -> String {
    let mut rng = OsRng;
    (0..RESET_TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Derive a base username from a federated identity.
///
/// Prefers the slugified display name; falls back to the email local part
/// stripped to `[a-z0-9-]`. Pads with `'0'` to the minimum username length
/// and truncates to the maximum. The result is a *candidate*: callers must
/// re-validate before use, since arbitrary Unicode names can degrade to
/// padding.
pub fn generate_username_from_google(display_name: Option<&str>, email: &str) -> String {
    let mut base = match display_name {
        Some(name) if !name.trim().is_empty() => slugify(name),
        _ => email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect(),
    };
    while base.chars().count() < 3 {
        base.push('0');
    }
    base.chars().take(30).collect()
}

/// Append a random base-36 suffix to a username base.
pub fn generate_unique_username(base: &str) -> String {
    format!("{}-{}", base, random_suffix(6))
}

fn random_suffix(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("short1", PasswordPolicyError::TooShort)]
    #[case("longenough1", PasswordPolicyError::MissingUppercase)]
    #[case("Longenough", PasswordPolicyError::MissingDigit)]
    #[case("Longenough1", PasswordPolicyError::MissingSymbol)]
    fn password_policy_reports_first_failure(
        #[case] password: &str,
        #[case] expected: PasswordPolicyError,
    ) {
        let err = validate_password(password).expect_err("policy must reject");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("Longenough1!")]
    #[case("Sup3r-secret")]
    #[case("A1;aaaaaa")]
    fn password_policy_accepts_conforming_passwords(#[case] password: &str) {
        validate_password(password).expect("policy should accept");
    }

    #[test]
    fn hash_round_trips_and_salts() {
        let first = hash_password("Longenough1!").expect("hashing succeeds");
        let second = hash_password("Longenough1!").expect("hashing succeeds");
        assert_ne!(first, second, "salted hashes must differ across calls");
        assert!(verify_password("Longenough1!", &first));
        assert!(verify_password("Longenough1!", &second));
        assert!(!verify_password("Longenough2!", &first));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("whatever", "not-a-bcrypt-hash"));
        assert!(!verify_password("whatever", ""));
    }

    #[rstest]
    #[case("Best Movies!! Of 2024", "best-movies-of-2024")]
    #[case("  Hello   World  ", "hello-world")]
    #[case("--a--b--", "a-b")]
    #[case("Ünïcode Graffiti", "ncode-graffiti")]
    #[case("", "")]
    fn slugify_is_deterministic(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn unique_slug_appends_base36_suffix() {
        let slug = generate_unique_slug("Best Movies");
        let (base, suffix) = slug.rsplit_once('-').expect("suffix is hyphen separated");
        assert_eq!(base, "best-movies");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| BASE36_ALPHABET.contains(&(c as u8))));
    }

    #[test]
    fn reset_token_has_expected_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_reset_token());
    }

    #[rstest]
    #[case(Some("Ada Lovelace"), "ada@example.com", "ada-lovelace")]
    #[case(None, "Ada.Byron@example.com", "adabyron")]
    #[case(None, "ab@example.com", "ab0")]
    #[case(Some("!!"), "x@example.com", "000")]
    fn username_derivation_covers_fallbacks(
        #[case] display_name: Option<&str>,
        #[case] email: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(generate_username_from_google(display_name, email), expected);
    }

    #[test]
    fn derived_username_is_truncated_to_maximum() {
        let name = "a".repeat(64);
        let derived = generate_username_from_google(Some(&name), "x@example.com");
        assert_eq!(derived.len(), 30);
    }

    #[test]
    fn unique_username_appends_suffix() {
        let username = generate_unique_username("user");
        assert!(username.starts_with("user-"));
        assert_eq!(username.len(), "user-".len() + 6);
    }
}

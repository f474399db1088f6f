//! Authentication service: signup, login, federated resolution, resets.
//!
//! Orchestrates the identity store, credential utilities, and mail delivery.
//! Session establishment happens at the HTTP edge; every operation here
//! returns the authenticated user's public projection for the handler to
//! persist into the session cookie.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use super::auth::{LoginCredentials, SignupCredentials};
use super::credentials;
use super::error::{Error, ErrorCode};
use super::ports::{
    FederatedIdentity, Mailer, NewUser, UserChanges, UserConstraint, UserPersistenceError,
    UserRepository,
};
use super::user::{AuthProvider, Email, PublicUser, User, UserId, Username};
use super::ApiResult;

/// Identical message for unknown email and wrong password, so responses do
/// not reveal which addresses have accounts.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

const FEDERATED_ONLY: &str =
    "This account uses Google sign-in. Please use \"Sign in with Google\" instead.";

/// Generic acknowledgement for reset requests, returned whether or not the
/// address has an account.
const RESET_ACKNOWLEDGEMENT: &str =
    "If an account with that email exists, a reset link has been generated";

/// Reset-token validity window.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Bound on username collision probes before the random fallback.
const USERNAME_PROBE_LIMIT: u8 = 10;

/// Outcome of a password-reset request.
///
/// `issued` is populated only when an account existed; the acknowledgement
/// message never varies. Demo deployments surface the link directly instead
/// of sending mail.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetIssue {
    /// Anti-enumeration acknowledgement, identical for every input.
    pub message: String,
    /// Token and link, present when a reset was actually issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<IssuedReset>,
}

/// A freshly issued reset token and the link that carries it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedReset {
    pub reset_token: String,
    pub reset_url: String,
}

/// Authentication service over the identity store.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    /// Absolute base URL used to assemble reset links.
    base_url: String,
}

fn map_store_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            error!(%message, "identity store unavailable");
            Error::service_unavailable(message)
        }
        UserPersistenceError::Query { message } => {
            error!(%message, "identity store query failed");
            Error::internal(message)
        }
        UserPersistenceError::Conflict { constraint } => {
            error!(?constraint, "unexpected identity constraint violation");
            Error::internal("unexpected constraint violation")
        }
    }
}

impl AuthService {
    /// Create a new service over the given store and mailer.
    pub fn new(users: Arc<dyn UserRepository>, mailer: Arc<dyn Mailer>, base_url: String) -> Self {
        Self {
            users,
            mailer,
            base_url,
        }
    }

    /// Register a local account.
    ///
    /// Duplicate checks are case-insensitive; the credentials are already
    /// canonical lowercase. The store's unique keys backstop the pre-checks
    /// against concurrent signups.
    pub async fn signup(&self, credentials: SignupCredentials) -> ApiResult<PublicUser> {
        if self
            .users
            .find_by_email(credentials.email())
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::new(
                ErrorCode::DuplicateEmail,
                "An account with this email already exists",
            ));
        }
        if self
            .users
            .find_by_username(credentials.username().as_str())
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            return Err(Error::new(
                ErrorCode::DuplicateUsername,
                "This username is already taken",
            ));
        }

        let password_hash = credentials::hash_password(credentials.password())
            .map_err(|err| Error::internal(format!("password hashing failed: {err}")))?;

        let created = self
            .users
            .create(NewUser {
                email: credentials.email().clone(),
                username: credentials.username().clone(),
                password_hash: Some(password_hash),
                google_id: None,
                auth_provider: AuthProvider::Local,
            })
            .await
            .map_err(|err| match err {
                UserPersistenceError::Conflict {
                    constraint: UserConstraint::Email,
                } => Error::new(
                    ErrorCode::DuplicateEmail,
                    "An account with this email already exists",
                ),
                UserPersistenceError::Conflict {
                    constraint: UserConstraint::Username,
                } => Error::new(ErrorCode::DuplicateUsername, "This username is already taken"),
                other => map_store_error(other),
            })?;

        Ok(created.public())
    }

    /// Authenticate a local account by email and password.
    pub async fn login(&self, credentials: LoginCredentials) -> ApiResult<PublicUser> {
        let Ok(email) = Email::parse(credentials.email()) else {
            // An address that cannot exist gets the same answer as a wrong
            // password.
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_store_error)?
        else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(Error::new(ErrorCode::FederatedOnlyAccount, FEDERATED_ONLY));
        };

        if !credentials::verify_password(credentials.password(), hash) {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        Ok(user.public())
    }

    /// Resolve a verified federated identity to a user, linking or creating
    /// as needed.
    ///
    /// Resolution order: exact match on the provider subject, then email
    /// match (account linking), then account creation with a derived
    /// username. All paths end with the same session shape as local login.
    pub async fn federated_login(&self, identity: FederatedIdentity) -> ApiResult<PublicUser> {
        let email = Email::parse(&identity.email).map_err(|_| {
            Error::invalid_request("Google account did not provide a usable email")
        })?;

        if let Some(user) = self
            .users
            .find_by_google_id(&identity.subject)
            .await
            .map_err(map_store_error)?
        {
            return Ok(user.public());
        }

        if let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_store_error)?
        {
            let linked = self.link_federated(&user, &identity.subject).await?;
            return Ok(linked.public());
        }

        let username = self.settle_username(&identity, &email).await?;
        let created = self
            .users
            .create(NewUser {
                email: email.clone(),
                username,
                password_hash: None,
                google_id: Some(identity.subject.clone()),
                auth_provider: AuthProvider::Federated,
            })
            .await;

        match created {
            Ok(user) => Ok(user.public()),
            // A concurrent login for the same person can win the create
            // race; fall back to the resolution the winner left behind.
            Err(UserPersistenceError::Conflict { .. }) => {
                if let Some(user) = self
                    .users
                    .find_by_google_id(&identity.subject)
                    .await
                    .map_err(map_store_error)?
                {
                    return Ok(user.public());
                }
                if let Some(user) = self
                    .users
                    .find_by_email(&email)
                    .await
                    .map_err(map_store_error)?
                {
                    let linked = self.link_federated(&user, &identity.subject).await?;
                    return Ok(linked.public());
                }
                Err(Error::internal("federated account resolution raced"))
            }
            Err(other) => Err(map_store_error(other)),
        }
    }

    /// Attach the federated subject to an existing account, preserving
    /// `Both` vs `Federated` based on password presence. Idempotent: a user
    /// that already carries the subject is returned unchanged.
    async fn link_federated(&self, user: &User, subject: &str) -> ApiResult<User> {
        if user.google_id.as_deref() == Some(subject) {
            return Ok(user.clone());
        }
        let provider = AuthProvider::from_presence(user.has_password(), true)
            .map_err(|err| Error::internal(format!("invalid credential state: {err}")))?;
        self.users
            .update(
                &user.id,
                UserChanges {
                    google_id: Some(subject.to_owned()),
                    auth_provider: Some(provider),
                    ..UserChanges::default()
                },
            )
            .await
            .map_err(map_store_error)
    }

    /// Pick a username for a new federated account.
    ///
    /// Probes the derived base for collisions, regenerating with a random
    /// suffix up to the bound, then falls back to a `"user"`-seeded random
    /// name. The settled candidate is re-validated; anything out of slug
    /// form or length bounds is discarded for the fallback.
    async fn settle_username(
        &self,
        identity: &FederatedIdentity,
        email: &Email,
    ) -> ApiResult<Username> {
        let base =
            credentials::generate_username_from_google(identity.display_name.as_deref(), email.as_str());
        let mut candidate = base.clone();
        let mut attempts: u8 = 0;
        while self
            .users
            .find_by_username(&candidate)
            .await
            .map_err(map_store_error)?
            .is_some()
        {
            if attempts >= USERNAME_PROBE_LIMIT {
                // Terminating fallback: collisions among random suffixes are
                // negligible and the store's unique key backstops the rest.
                candidate = credentials::generate_unique_username("user");
                break;
            }
            candidate = credentials::generate_unique_username(&base);
            attempts += 1;
        }

        match Username::parse(&candidate) {
            Ok(username) => Ok(username),
            Err(_) => {
                let fallback = credentials::generate_unique_username("user");
                Username::parse(&fallback)
                    .map_err(|err| Error::internal(format!("fallback username invalid: {err}")))
            }
        }
    }

    /// Issue a password-reset token.
    ///
    /// Always acknowledges with the same message. The "user not found" case
    /// is an intentional anti-enumeration no-op, not an error.
    pub async fn request_password_reset(&self, email_raw: &str) -> ApiResult<ResetIssue> {
        if email_raw.trim().is_empty() {
            return Err(Error::invalid_request("Email is required"));
        }

        let acknowledged = ResetIssue {
            message: RESET_ACKNOWLEDGEMENT.to_owned(),
            issued: None,
        };

        let Ok(email) = Email::parse(email_raw) else {
            return Ok(acknowledged);
        };
        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_store_error)?
        else {
            return Ok(acknowledged);
        };

        let reset_token = credentials::generate_reset_token();
        let expiry = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users
            .update(
                &user.id,
                UserChanges {
                    reset_token: Some(Some(reset_token.clone())),
                    reset_token_expiry: Some(Some(expiry)),
                    ..UserChanges::default()
                },
            )
            .await
            .map_err(map_store_error)?;

        let reset_url = format!("{}/auth/reset-password?token={reset_token}", self.base_url);
        if let Err(err) = self.mailer.send_password_reset(&email, &reset_url).await {
            // Delivery is fire-and-forget; the token is already persisted.
            warn!(error = %err, "password reset delivery failed");
        }

        Ok(ResetIssue {
            message: RESET_ACKNOWLEDGEMENT.to_owned(),
            issued: Some(IssuedReset {
                reset_token,
                reset_url,
            }),
        })
    }

    /// Resolve the session's user, if the account still exists.
    pub async fn current_user(&self, id: &UserId) -> ApiResult<Option<PublicUser>> {
        Ok(self
            .users
            .find_by_id(id)
            .await
            .map_err(map_store_error)?
            .map(|user| user.public()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for signup, login, and federated resolution.
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::domain::ports::MailerError;

    #[derive(Default)]
    struct StubState {
        users: Vec<User>,
        fail_lookups: bool,
    }

    #[derive(Default)]
    struct StubUserRepository {
        state: Mutex<StubState>,
    }

    impl StubUserRepository {
        fn with_users(users: Vec<User>) -> Self {
            Self {
                state: Mutex::new(StubState {
                    users,
                    fail_lookups: false,
                }),
            }
        }

        fn failing() -> Self {
            Self {
                state: Mutex::new(StubState {
                    users: Vec::new(),
                    fail_lookups: true,
                }),
            }
        }

        fn snapshot(&self) -> Vec<User> {
            self.state.lock().expect("state lock").users.clone()
        }
    }

    #[async_trait]
    impl UserRepository for StubUserRepository {
        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
            let state = self.state.lock().expect("state lock");
            if state.fail_lookups {
                return Err(UserPersistenceError::query("database query failed"));
            }
            Ok(state.users.iter().find(|u| &u.id == id).cloned())
        }

        async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError> {
            let state = self.state.lock().expect("state lock");
            if state.fail_lookups {
                return Err(UserPersistenceError::query("database query failed"));
            }
            Ok(state.users.iter().find(|u| &u.email == email).cloned())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<User>, UserPersistenceError> {
            let state = self.state.lock().expect("state lock");
            if state.fail_lookups {
                return Err(UserPersistenceError::query("database query failed"));
            }
            Ok(state
                .users
                .iter()
                .find(|u| u.username.as_str() == username)
                .cloned())
        }

        async fn find_by_google_id(
            &self,
            google_id: &str,
        ) -> Result<Option<User>, UserPersistenceError> {
            let state = self.state.lock().expect("state lock");
            Ok(state
                .users
                .iter()
                .find(|u| u.google_id.as_deref() == Some(google_id))
                .cloned())
        }

        async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError> {
            let mut state = self.state.lock().expect("state lock");
            if state.users.iter().any(|u| u.email == new_user.email) {
                return Err(UserPersistenceError::Conflict {
                    constraint: UserConstraint::Email,
                });
            }
            if state.users.iter().any(|u| u.username == new_user.username) {
                return Err(UserPersistenceError::Conflict {
                    constraint: UserConstraint::Username,
                });
            }
            let now = Utc::now();
            let user = User {
                id: UserId::random(),
                email: new_user.email,
                username: new_user.username,
                password_hash: new_user.password_hash,
                google_id: new_user.google_id,
                auth_provider: new_user.auth_provider,
                reset_token: None,
                reset_token_expiry: None,
                created_at: now,
                updated_at: now,
            };
            state.users.push(user.clone());
            Ok(user)
        }

        async fn update(
            &self,
            id: &UserId,
            changes: UserChanges,
        ) -> Result<User, UserPersistenceError> {
            let mut state = self.state.lock().expect("state lock");
            let user = state
                .users
                .iter_mut()
                .find(|u| &u.id == id)
                .ok_or_else(|| UserPersistenceError::query("record not found"))?;
            if let Some(google_id) = changes.google_id {
                user.google_id = Some(google_id);
            }
            if let Some(provider) = changes.auth_provider {
                user.auth_provider = provider;
            }
            if let Some(token) = changes.reset_token {
                user.reset_token = token;
            }
            if let Some(expiry) = changes.reset_token_expiry {
                user.reset_token_expiry = expiry;
            }
            user.updated_at = Utc::now();
            Ok(user.clone())
        }
    }

    struct NullMailer;

    #[async_trait]
    impl Mailer for NullMailer {
        async fn send_password_reset(
            &self,
            _email: &Email,
            _reset_url: &str,
        ) -> Result<(), MailerError> {
            Ok(())
        }
    }

    fn service(repo: Arc<StubUserRepository>) -> AuthService {
        AuthService::new(repo, Arc::new(NullMailer), "http://localhost:3000".into())
    }

    fn local_user(email: &str, username: &str, password: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::random(),
            email: Email::parse(email).expect("valid email"),
            username: Username::parse(username).expect("valid username"),
            password_hash: Some(credentials::hash_password(password).expect("hash")),
            google_id: None,
            auth_provider: AuthProvider::Local,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn signup_creds() -> SignupCredentials {
        SignupCredentials::try_from_parts("ada@example.com", "ada-lovelace", "Longenough1!")
            .expect("valid signup")
    }

    #[tokio::test]
    async fn signup_creates_local_account() {
        let repo = Arc::new(StubUserRepository::default());
        let public = service(repo.clone())
            .signup(signup_creds())
            .await
            .expect("signup succeeds");
        assert_eq!(public.email.as_str(), "ada@example.com");
        assert_eq!(public.username.as_str(), "ada-lovelace");

        let stored = repo.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].auth_provider, AuthProvider::Local);
        let hash = stored[0].password_hash.as_deref().expect("hash stored");
        assert!(credentials::verify_password("Longenough1!", hash));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_case_insensitively() {
        let repo = Arc::new(StubUserRepository::with_users(vec![local_user(
            "ada@example.com",
            "other-name",
            "Longenough1!",
        )]));
        let err = service(repo)
            .signup(signup_creds())
            .await
            .expect_err("duplicate email");
        assert_eq!(err.code, ErrorCode::DuplicateEmail);
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_username() {
        let repo = Arc::new(StubUserRepository::with_users(vec![local_user(
            "other@example.com",
            "ada-lovelace",
            "Longenough1!",
        )]));
        let err = service(repo)
            .signup(signup_creds())
            .await
            .expect_err("duplicate username");
        assert_eq!(err.code, ErrorCode::DuplicateUsername);
    }

    #[tokio::test]
    async fn login_does_not_reveal_which_credential_failed() {
        let repo = Arc::new(StubUserRepository::with_users(vec![local_user(
            "ada@example.com",
            "ada",
            "Longenough1!",
        )]));
        let svc = service(repo);

        let unknown = svc
            .login(LoginCredentials::try_from_parts("ghost@example.com", "Longenough1!").unwrap())
            .await
            .expect_err("unknown email fails");
        let wrong = svc
            .login(LoginCredentials::try_from_parts("ada@example.com", "Wrong-pass1!").unwrap())
            .await
            .expect_err("wrong password fails");

        assert_eq!(unknown.code, ErrorCode::Unauthorized);
        assert_eq!(wrong.code, ErrorCode::Unauthorized);
        assert_eq!(unknown.message, wrong.message);
    }

    #[tokio::test]
    async fn login_succeeds_and_lowercases_email() {
        let repo = Arc::new(StubUserRepository::with_users(vec![local_user(
            "ada@example.com",
            "ada",
            "Longenough1!",
        )]));
        let public = service(repo)
            .login(LoginCredentials::try_from_parts("ADA@Example.com", "Longenough1!").unwrap())
            .await
            .expect("login succeeds");
        assert_eq!(public.username.as_str(), "ada");
    }

    #[tokio::test]
    async fn login_directs_federated_only_accounts_to_google() {
        let mut user = local_user("ada@example.com", "ada", "Longenough1!");
        user.password_hash = None;
        user.google_id = Some("google-sub-1".into());
        user.auth_provider = AuthProvider::Federated;
        let repo = Arc::new(StubUserRepository::with_users(vec![user]));
        let err = service(repo)
            .login(LoginCredentials::try_from_parts("ada@example.com", "Longenough1!").unwrap())
            .await
            .expect_err("federated-only account");
        assert_eq!(err.code, ErrorCode::FederatedOnlyAccount);
    }

    fn identity(subject: &str, email: &str) -> FederatedIdentity {
        FederatedIdentity {
            subject: subject.to_owned(),
            email: email.to_owned(),
            display_name: Some("Ada Lovelace".to_owned()),
            picture_url: None,
        }
    }

    #[tokio::test]
    async fn federated_login_links_existing_local_account() {
        let existing = local_user("a@x.com", "ada", "Longenough1!");
        let repo = Arc::new(StubUserRepository::with_users(vec![existing.clone()]));
        let public = service(repo.clone())
            .federated_login(identity("google-sub-1", "a@x.com"))
            .await
            .expect("link succeeds");

        assert_eq!(public.id, existing.id, "no duplicate user created");
        let stored = repo.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].google_id.as_deref(), Some("google-sub-1"));
        assert_eq!(stored[0].auth_provider, AuthProvider::Both);
    }

    #[tokio::test]
    async fn federated_login_resolves_by_subject_first() {
        let mut existing = local_user("a@x.com", "ada", "Longenough1!");
        existing.google_id = Some("google-sub-1".into());
        existing.auth_provider = AuthProvider::Both;
        let repo = Arc::new(StubUserRepository::with_users(vec![existing.clone()]));
        // A changed email on the provider side must not create a new user.
        let public = service(repo.clone())
            .federated_login(identity("google-sub-1", "renamed@x.com"))
            .await
            .expect("subject match wins");
        assert_eq!(public.id, existing.id);
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn federated_login_creates_account_with_derived_username() {
        let repo = Arc::new(StubUserRepository::default());
        let public = service(repo.clone())
            .federated_login(identity("google-sub-2", "ada@x.com"))
            .await
            .expect("create succeeds");
        assert_eq!(public.username.as_str(), "ada-lovelace");

        let stored = repo.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].auth_provider, AuthProvider::Federated);
        assert!(stored[0].password_hash.is_none());
    }

    #[tokio::test]
    async fn federated_username_collision_never_overwrites() {
        let first = local_user("first@x.com", "ada-lovelace", "Longenough1!");
        let repo = Arc::new(StubUserRepository::with_users(vec![first.clone()]));
        let public = service(repo.clone())
            .federated_login(identity("google-sub-3", "second@x.com"))
            .await
            .expect("collision resolved");

        assert_ne!(public.id, first.id);
        assert_ne!(public.username.as_str(), "ada-lovelace");
        assert!(
            public.username.as_str().starts_with("ada-lovelace-")
                || public.username.as_str().starts_with("user-"),
            "unexpected username {}",
            public.username
        );
        assert_eq!(repo.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn reset_acknowledges_unknown_addresses_without_issuing() {
        let repo = Arc::new(StubUserRepository::default());
        let issue = service(repo)
            .request_password_reset("ghost@example.com")
            .await
            .expect("generic acknowledgement");
        assert!(issue.issued.is_none());
        assert_eq!(issue.message, RESET_ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn reset_issues_token_with_expiry_for_known_accounts() {
        let user = local_user("ada@example.com", "ada", "Longenough1!");
        let repo = Arc::new(StubUserRepository::with_users(vec![user]));
        let issue = service(repo.clone())
            .request_password_reset("ADA@example.com")
            .await
            .expect("issue succeeds");

        let issued = issue.issued.expect("token issued");
        assert_eq!(issued.reset_token.len(), 64);
        assert!(issued.reset_url.contains(&issued.reset_token));

        let stored = repo.snapshot();
        assert_eq!(stored[0].reset_token.as_deref(), Some(issued.reset_token.as_str()));
        let expiry = stored[0].reset_token_expiry.expect("expiry set");
        let ttl = expiry - Utc::now();
        assert!(ttl <= Duration::hours(1) && ttl > Duration::minutes(55));
    }

    #[tokio::test]
    async fn storage_failures_surface_as_generic_internal_errors() {
        let repo = Arc::new(StubUserRepository::failing());
        let err = service(repo)
            .login(LoginCredentials::try_from_parts("a@b.co", "pw").unwrap())
            .await
            .expect_err("lookup failure propagates");
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}

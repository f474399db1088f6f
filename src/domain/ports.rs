//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the relational store, the identity provider, mail delivery). Each trait
//! exposes strongly typed errors so adapters map their failures into
//! predictable variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::catalogue::{Category, CategoryId, CategorySummary};
use super::list::{
    BrowseFilter, List, ListChanges, ListDetail, ListId, ListSummary, NewList, Page,
};
use super::user::{AuthProvider, Email, User, UserId, Username};
use super::vote::{Vote, VoteDetail, VoteId, VoteWithList};

/// Unique keys an identity-store insert can collide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConstraint {
    Email,
    Username,
    GoogleId,
}

/// Persistence errors raised by [`UserRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserPersistenceError {
    /// Repository connection could not be established.
    #[error("user repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("user repository query failed: {message}")]
    Query { message: String },
    /// A unique key collided with an existing row.
    #[error("user constraint violation on {constraint:?}")]
    Conflict { constraint: UserConstraint },
}

impl UserPersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Fields required to create a user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: Username,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub auth_provider: AuthProvider,
}

/// Partial update applied to a user record. `None` leaves a field as is;
/// double options clear a nullable column when `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub google_id: Option<String>,
    pub auth_provider: Option<AuthProvider>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expiry: Option<Option<DateTime<Utc>>>,
}

/// Identity store over user records.
///
/// Email/username lookups are case-insensitive by contract: callers pass
/// canonical lowercase values (the newtypes guarantee this) and the store
/// holds the canonical form.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError>;
    /// Lookup by raw lowercase username. Takes a string rather than
    /// [`Username`] so collision probes can test candidates that have not
    /// yet passed validation.
    async fn find_by_username(&self, username: &str)
    -> Result<Option<User>, UserPersistenceError>;
    async fn find_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, UserPersistenceError>;
    async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError>;
    async fn update(
        &self,
        id: &UserId,
        changes: UserChanges,
    ) -> Result<User, UserPersistenceError>;
}

/// Persistence errors raised by [`CategoryRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CataloguePersistenceError {
    #[error("catalogue repository connection failed: {message}")]
    Connection { message: String },
    #[error("catalogue repository query failed: {message}")]
    Query { message: String },
}

impl CataloguePersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Read-only access to the category catalogue, plus the one-off seed hook.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by name, each with its list count.
    async fn list_with_counts(&self) -> Result<Vec<CategorySummary>, CataloguePersistenceError>;
    async fn find_by_id(
        &self,
        id: &CategoryId,
    ) -> Result<Option<Category>, CataloguePersistenceError>;
    /// Idempotently install the fixed catalogue. Existing slugs are left
    /// untouched.
    async fn seed_catalogue(&self) -> Result<(), CataloguePersistenceError>;
}

/// Persistence errors raised by [`ListRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListPersistenceError {
    #[error("list repository connection failed: {message}")]
    Connection { message: String },
    #[error("list repository query failed: {message}")]
    Query { message: String },
    /// The generated slug collided with an existing list.
    #[error("list slug already exists")]
    SlugConflict,
}

impl ListPersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Store access for top-ten lists and their items.
#[async_trait]
pub trait ListRepository: Send + Sync {
    async fn find_by_id(&self, id: &ListId) -> Result<Option<List>, ListPersistenceError>;
    /// Hydrated lookup by id or, failing that, by slug.
    async fn find_detail(&self, key: &str) -> Result<Option<ListDetail>, ListPersistenceError>;
    /// Insert the list and its items in one transaction.
    async fn create(&self, new_list: NewList) -> Result<ListDetail, ListPersistenceError>;
    /// Apply changes and, when items are supplied, replace the item set,
    /// all in one transaction.
    async fn update(
        &self,
        id: &ListId,
        changes: ListChanges,
    ) -> Result<ListDetail, ListPersistenceError>;
    /// Delete the list. Items and votes go with it (cascade contract of
    /// the storage layer).
    async fn delete(&self, id: &ListId) -> Result<(), ListPersistenceError>;
    /// Page through lists ordered by vote count, then recency.
    async fn browse(
        &self,
        filter: &BrowseFilter,
    ) -> Result<Page<ListSummary>, ListPersistenceError>;
}

/// Persistence errors raised by [`VoteStore`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotePersistenceError {
    #[error("vote store connection failed: {message}")]
    Connection { message: String },
    #[error("vote store query failed: {message}")]
    Query { message: String },
    /// A unique key on (user, category) or (user, list) collided: the
    /// caller lost a race and should re-read before retrying.
    #[error("vote uniqueness conflict")]
    Conflict,
}

impl VotePersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Store access for votes.
///
/// ## Contract
/// The store enforces unique keys on the effective (user, category) pair and
/// on (user, list). [`VoteStore::replace`] MUST delete the old row and insert
/// the new one inside a single transaction: no interleaving may observe the
/// user with zero or two votes in a category across that call.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// The user's existing vote in a category, joined with its list title.
    async fn find_for_user_in_category(
        &self,
        user_id: &UserId,
        category_id: &CategoryId,
    ) -> Result<Option<VoteWithList>, VotePersistenceError>;
    async fn find_by_user_and_list(
        &self,
        user_id: &UserId,
        list_id: &ListId,
    ) -> Result<Option<Vote>, VotePersistenceError>;
    /// Insert a fresh vote. Fails with [`VotePersistenceError::Conflict`]
    /// if a unique key collides.
    async fn insert(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError>;
    /// Atomically replace `old_vote` with a fresh vote for `list_id`.
    async fn replace(
        &self,
        old_vote: &VoteId,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError>;
    async fn delete(&self, vote_id: &VoteId) -> Result<(), VotePersistenceError>;
    /// All votes by a user with list and category context.
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<VoteDetail>, VotePersistenceError>;
}

/// A verified assertion from the external identity provider.
///
/// The provider's protocol mechanics are out of scope; by the time this
/// struct exists the subject and email have been verified upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Provider subject identifier.
    pub subject: String,
    /// Email asserted by the provider (not yet canonicalised).
    pub email: String,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
}

/// Errors raised while resolving an authorization code into an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityProviderError {
    /// The code exchange or profile fetch failed.
    #[error("identity provider exchange failed: {message}")]
    Exchange { message: String },
    /// The provider response lacked a subject or email.
    #[error("identity assertion is missing required fields")]
    MissingFields,
}

impl IdentityProviderError {
    /// Helper for exchange failures.
    pub fn exchange(message: impl Into<String>) -> Self {
        Self::Exchange {
            message: message.into(),
        }
    }
}

/// Driven port for the federated identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL the browser is redirected to; `state` round-trips
    /// the caller's return URL.
    fn authorization_url(&self, state: &str) -> String;
    /// Exchange an authorization code for a verified identity assertion.
    async fn resolve_code(&self, code: &str) -> Result<FederatedIdentity, IdentityProviderError>;
}

/// Errors raised by mail delivery adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mail delivery failed: {message}")]
pub struct MailerError {
    pub message: String,
}

impl MailerError {
    /// Wrap an adapter failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outbound mail delivery. Fire-and-forget from the core's perspective:
/// callers log failures but do not surface them to the client.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a password-reset link to the given address.
    async fn send_password_reset(&self, email: &Email, reset_url: &str) -> Result<(), MailerError>;
}

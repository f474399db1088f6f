//! Domain primitives, aggregates, and services.
//!
//! Purpose: Define strongly typed domain entities used by the HTTP and
//! persistence layers, the driven ports those layers plug into, and the
//! services carrying the two rule-bearing subsystems (authentication and
//! voting). Keep types immutable and document invariants in each type's
//! Rustdoc.

pub mod auth;
pub mod auth_service;
pub mod catalogue;
pub mod credentials;
pub mod error;
pub mod list;
pub mod list_service;
pub mod ports;
pub mod user;
pub mod vote;
pub mod vote_service;

pub use self::auth::{
    LoginCredentials, LoginValidationError, SignupCredentials, SignupValidationError,
};
pub use self::auth_service::{AuthService, ResetIssue};
pub use self::catalogue::{Category, CategoryId, CategorySummary};
pub use self::error::{Error, ErrorCode};
pub use self::list::{
    BrowseFilter, ListChanges, ListDetail, ListId, ListItem, ListOwner, ListSummary, NewList,
    NewListItem, Page,
};
pub use self::list_service::{CreateListRequest, ListService};
pub use self::user::{AuthProvider, Email, PublicUser, User, UserId, Username, UserValidationError};
pub use self::vote::{Vote, VoteDetail, VoteId, VoteOutcome};
pub use self::vote_service::VoteService;

/// Convenient result alias for service and handler code.
pub type ApiResult<T> = Result<T, Error>;

//! Vote aggregate and outcomes.
//!
//! ## Invariant
//! For any (user, category) pair, at most one vote exists whose referenced
//! list belongs to that category. The constraint spans two entities (the
//! vote and its list), so the service layer enforces it on top of the
//! store's unique keys; see [`VoteService`](super::vote_service::VoteService).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalogue::{Category, CategoryId};
use super::list::ListId;
use super::user::UserId;

/// Stable vote identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(Uuid);

impl VoteId {
    /// Generate a new random [`VoteId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for VoteId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single vote by a user for a list.
///
/// `category_id` is denormalised from the list at insert time so the store
/// can enforce the per-category invariant with a plain unique key.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub list_id: ListId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}

/// An existing vote joined with the title of the list it targets, as read
/// by the cast/switch path.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteWithList {
    pub vote: Vote,
    pub list_title: String,
}

/// A vote hydrated with list and category context for listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetail {
    #[schema(value_type = String)]
    pub id: VoteId,
    #[schema(value_type = String)]
    pub list_id: ListId,
    pub list_title: String,
    pub list_slug: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful cast.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VoteOutcome {
    /// First vote in this category.
    Created,
    /// An existing vote in the category was atomically replaced.
    #[serde(rename_all = "camelCase")]
    Switched {
        /// Title of the list the vote moved away from.
        from_title: String,
        /// Title of the list the vote now targets.
        to_title: String,
    },
}

impl VoteOutcome {
    /// User-facing confirmation message.
    pub fn message(&self) -> String {
        match self {
            Self::Created => "Vote recorded successfully".to_owned(),
            Self::Switched {
                from_title,
                to_title,
            } => format!("Vote changed from \"{from_title}\" to \"{to_title}\""),
        }
    }
}

//! Top-ten list aggregate.
//!
//! A list belongs to exactly one category and carries between one and ten
//! ranked items. Items are replaced wholesale on update.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalogue::{Category, CategoryId};
use super::user::{UserId, Username};

/// Maximum number of items a list may carry.
pub const MAX_ITEMS: usize = 10;

/// Stable list identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(Uuid);

impl ListId {
    /// Generate a new random [`ListId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ListId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A top-ten list as held by the store, without its items.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub id: ListId,
    pub title: String,
    pub description: Option<String>,
    /// Unique URL slug, derived from the title plus a random suffix.
    pub slug: String,
    pub is_public: bool,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ranked item within a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    /// Rank within the list, 1 through 10.
    pub rank: i32,
    /// Item title.
    pub title: String,
    /// Optional blurb.
    pub description: Option<String>,
}

/// Owner attribution included alongside a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListOwner {
    /// Owning user's id.
    #[schema(value_type = String)]
    pub id: UserId,
    /// Owning user's username.
    #[schema(value_type = String)]
    pub username: Username,
}

/// A list hydrated with owner, category, items, and vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListDetail {
    #[schema(value_type = String)]
    pub id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub user: ListOwner,
    pub category: Category,
    pub items: Vec<ListItem>,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list row for browse pages: items truncated to a short preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    #[schema(value_type = String)]
    pub id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub user: ListOwner,
    pub category: Category,
    /// First few items by rank, for card previews.
    pub items: Vec<ListItem>,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a list. Construction is validated by
/// [`ListService`](super::list_service::ListService).
#[derive(Debug, Clone)]
pub struct NewList {
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub items: Vec<NewListItem>,
}

/// An item draft supplied by the caller; ranks are assigned by position.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewListItem {
    pub title: String,
    pub description: Option<String>,
}

/// Partial update applied to an existing list. `None` leaves a field as is;
/// `items: Some(_)` replaces the full item set.
#[derive(Debug, Clone, Default)]
pub struct ListChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<CategoryId>,
    pub is_public: Option<bool>,
    pub items: Option<Vec<NewListItem>>,
}

/// Browse filter for public list pages and per-user dashboards.
#[derive(Debug, Clone, Default)]
pub struct BrowseFilter {
    /// Restrict to one category by slug.
    pub category_slug: Option<String>,
    /// Restrict to one owner.
    pub user_id: Option<UserId>,
    /// Include private lists. Set by the service only when the viewer is
    /// browsing their own lists; never taken from request input.
    pub include_private: bool,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl BrowseFilter {
    /// Default browse page size.
    pub const DEFAULT_PER_PAGE: u32 = 12;

    /// Normalise page/per-page to sane bounds.
    pub fn normalised(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.per_page == 0 {
            self.per_page = Self::DEFAULT_PER_PAGE;
        }
        self.per_page = self.per_page.min(100);
        self
    }

    /// Row offset for the current page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// One page of browse results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page, deriving the page count from the total.
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let per = i64::from(per_page.max(1));
        Self {
            items,
            page,
            per_page,
            total,
            total_pages: total / per + i64::from(total % per > 0),
        }
    }
}

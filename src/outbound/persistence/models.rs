//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{categories, list_items, top_ten_lists, users, votes};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub auth_provider: String,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: Option<&'a str>,
    pub google_id: Option<&'a str>,
    pub auth_provider: &'a str,
}

/// Changeset struct for updating existing user records.
///
/// Single options skip the column when `None`; double options write NULL
/// when `Some(None)`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserChangesRow {
    pub google_id: Option<String>,
    pub auth_provider: Option<String>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expiry: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the categories table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Insertable struct for seeding the category catalogue.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = categories)]
pub(crate) struct NewCategoryRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub icon: Option<&'a str>,
}

/// Row struct for reading from the top_ten_lists table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = top_ten_lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ListRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new lists.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = top_ten_lists)]
pub(crate) struct NewListRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub slug: &'a str,
    pub is_public: bool,
    pub user_id: Uuid,
    pub category_id: Uuid,
}

/// Changeset struct for updating existing lists.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = top_ten_lists)]
pub(crate) struct ListChangesRow {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

/// Owner attribution projected from the users table for list hydration.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OwnerRow {
    pub id: Uuid,
    pub username: String,
}

/// Row struct for reading from the list_items table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = list_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ListItemRow {
    pub id: Uuid,
    pub list_id: Uuid,
    pub rank: i32,
    pub title: String,
    pub description: Option<String>,
}

/// Insertable struct for creating list items.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = list_items)]
pub(crate) struct NewListItemRow<'a> {
    pub id: Uuid,
    pub list_id: Uuid,
    pub rank: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

/// Row struct for reading from the votes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VoteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub list_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating votes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub(crate) struct NewVoteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub list_id: Uuid,
    pub category_id: Uuid,
}

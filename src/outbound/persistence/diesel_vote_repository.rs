//! PostgreSQL-backed `VoteStore` implementation using Diesel ORM.
//!
//! The `votes` table carries unique keys on (user_id, category_id) and
//! (user_id, list_id); any violation maps to `Conflict` so the service can
//! re-read and settle a lost race. The switch path runs delete + insert in
//! one transaction: a crash or concurrent interleaving can never leave the
//! user with two votes in a category.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{VotePersistenceError, VoteStore};
use crate::domain::vote::{Vote, VoteDetail, VoteId, VoteWithList};
use crate::domain::{CategoryId, ListId, UserId};

use super::diesel_catalogue_repository::row_to_category;
use super::error_mapping::{map_basic_diesel_error, map_basic_pool_error, unique_violation};
use super::models::{CategoryRow, NewVoteRow, VoteRow};
use super::pool::{DbPool, PoolError, checkout};
use super::schema::{categories, top_ten_lists, votes};

/// Diesel-backed implementation of the vote store port.
#[derive(Clone)]
pub struct DieselVoteStore {
    pool: DbPool,
}

impl DieselVoteStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> VotePersistenceError {
    map_basic_pool_error(error, |message| VotePersistenceError::Connection { message })
}

impl From<diesel::result::Error> for VotePersistenceError {
    fn from(error: diesel::result::Error) -> Self {
        if unique_violation(&error).is_some() {
            return Self::Conflict;
        }
        map_basic_diesel_error(
            error,
            |message| Self::query(message),
            |message| Self::connection(message),
        )
    }
}

fn row_to_vote(row: VoteRow) -> Vote {
    Vote {
        id: VoteId::from(row.id),
        user_id: UserId::from(row.user_id),
        list_id: ListId::from(row.list_id),
        category_id: CategoryId::from(row.category_id),
        created_at: row.created_at,
    }
}

fn new_vote_row(user_id: &UserId, list_id: &ListId, category_id: &CategoryId) -> NewVoteRow {
    NewVoteRow {
        id: Uuid::new_v4(),
        user_id: *user_id.as_uuid(),
        list_id: *list_id.as_uuid(),
        category_id: *category_id.as_uuid(),
    }
}

#[async_trait]
impl VoteStore for DieselVoteStore {
    async fn find_for_user_in_category(
        &self,
        user_id: &UserId,
        category_id: &CategoryId,
    ) -> Result<Option<VoteWithList>, VotePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: Option<(VoteRow, String)> = votes::table
            .inner_join(top_ten_lists::table)
            .filter(votes::user_id.eq(*user_id.as_uuid()))
            .filter(votes::category_id.eq(*category_id.as_uuid()))
            .select((VoteRow::as_select(), top_ten_lists::title))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(|(vote, list_title)| VoteWithList {
            vote: row_to_vote(vote),
            list_title,
        }))
    }

    async fn find_by_user_and_list(
        &self,
        user_id: &UserId,
        list_id: &ListId,
    ) -> Result<Option<Vote>, VotePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = votes::table
            .filter(votes::user_id.eq(*user_id.as_uuid()))
            .filter(votes::list_id.eq(*list_id.as_uuid()))
            .select(VoteRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(row_to_vote))
    }

    async fn insert(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: VoteRow = diesel::insert_into(votes::table)
            .values(new_vote_row(user_id, list_id, category_id))
            .returning(VoteRow::as_select())
            .get_result(&mut conn)
            .await?;
        Ok(row_to_vote(row))
    }

    async fn replace(
        &self,
        old_vote: &VoteId,
        user_id: &UserId,
        list_id: &ListId,
        category_id: &CategoryId,
    ) -> Result<Vote, VotePersistenceError> {
        let old_id = *old_vote.as_uuid();
        let values = new_vote_row(user_id, list_id, category_id);
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;

        // Delete and insert must commit together: an interleaving that
        // observed only the delete would show zero votes, and one that
        // observed only the insert would show two. The unique key on
        // (user_id, category_id) turns a concurrent double-switch into a
        // Conflict here rather than a second row.
        conn.transaction(|conn| {
            async move {
                diesel::delete(votes::table.find(old_id))
                    .execute(conn)
                    .await?;
                let row: VoteRow = diesel::insert_into(votes::table)
                    .values(values)
                    .returning(VoteRow::as_select())
                    .get_result(conn)
                    .await?;
                Ok(row_to_vote(row))
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete(&self, vote_id: &VoteId) -> Result<(), VotePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        diesel::delete(votes::table.find(*vote_id.as_uuid()))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<VoteDetail>, VotePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<(VoteRow, String, String, CategoryRow)> = votes::table
            .inner_join(top_ten_lists::table.inner_join(categories::table))
            .filter(votes::user_id.eq(*user_id.as_uuid()))
            .order(votes::created_at.desc())
            .select((
                VoteRow::as_select(),
                top_ten_lists::title,
                top_ten_lists::slug,
                CategoryRow::as_select(),
            ))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(vote, list_title, list_slug, category)| VoteDetail {
                id: VoteId::from(vote.id),
                list_id: ListId::from(vote.list_id),
                list_title,
                list_slug,
                category: row_to_category(category),
                created_at: vote.created_at,
            })
            .collect())
    }
}

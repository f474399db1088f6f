//! PostgreSQL-backed `CategoryRepository` implementation using Diesel ORM.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::catalogue::{CATEGORY_SEEDS, Category, CategoryId, CategorySummary};
use crate::domain::ports::{CataloguePersistenceError, CategoryRepository};

use super::error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{CategoryRow, NewCategoryRow};
use super::pool::{DbPool, PoolError, checkout};
use super::schema::{categories, top_ten_lists};

/// Diesel-backed implementation of the category catalogue port.
#[derive(Clone)]
pub struct DieselCategoryRepository {
    pool: DbPool,
}

impl DieselCategoryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CataloguePersistenceError {
    map_basic_pool_error(error, |message| CataloguePersistenceError::Connection {
        message,
    })
}

fn map_diesel_error(error: diesel::result::Error) -> CataloguePersistenceError {
    map_basic_diesel_error(
        error,
        |message| CataloguePersistenceError::query(message),
        |message| CataloguePersistenceError::connection(message),
    )
}

pub(crate) fn row_to_category(row: CategoryRow) -> Category {
    Category {
        id: CategoryId::from(row.id),
        name: row.name,
        slug: row.slug,
        description: row.description,
        icon: row.icon,
    }
}

#[async_trait]
impl CategoryRepository for DieselCategoryRepository {
    async fn list_with_counts(&self) -> Result<Vec<CategorySummary>, CataloguePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;

        let rows: Vec<CategoryRow> = categories::table
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let counts: Vec<(Uuid, i64)> = top_ten_lists::table
            .group_by(top_ten_lists::category_id)
            .select((top_ten_lists::category_id, count_star()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let counts: HashMap<Uuid, i64> = counts.into_iter().collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let list_count = counts.get(&row.id).copied().unwrap_or(0);
                CategorySummary {
                    category: row_to_category(row),
                    list_count,
                }
            })
            .collect())
    }

    async fn find_by_id(
        &self,
        id: &CategoryId,
    ) -> Result<Option<Category>, CataloguePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = categories::table
            .find(*id.as_uuid())
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_category))
    }

    async fn seed_catalogue(&self) -> Result<(), CataloguePersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<NewCategoryRow<'_>> = CATEGORY_SEEDS
            .iter()
            .map(|seed| NewCategoryRow {
                id: Uuid::new_v4(),
                name: seed.name,
                slug: seed.slug,
                description: Some(seed.description),
                icon: Some(seed.icon),
            })
            .collect();

        diesel::insert_into(categories::table)
            .values(&rows)
            .on_conflict(categories::slug)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}

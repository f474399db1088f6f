//! PostgreSQL-backed `ListRepository` implementation using Diesel ORM.
//!
//! Item replacement and list creation run inside single transactions so a
//! list is never observable with a partial item set. Browse ordering needs
//! an aggregate (vote count) in `ORDER BY`, so that one query is raw SQL;
//! everything else uses the typed DSL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Nullable, Text, Timestamptz, Uuid as SqlUuid, VarChar};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{ListPersistenceError, ListRepository};
use crate::domain::{
    BrowseFilter, CategoryId, ListChanges, ListDetail, ListId, ListItem, ListOwner, ListSummary,
    NewList, Page, UserId, Username,
};
use crate::domain::catalogue::Category;
use crate::domain::list::List;

use super::diesel_catalogue_repository::row_to_category;
use super::error_mapping::{map_basic_diesel_error, map_basic_pool_error, unique_violation};
use super::models::{
    CategoryRow, ListChangesRow, ListItemRow, ListRow, NewListItemRow, NewListRow, OwnerRow,
};
use super::pool::{DbPool, PoolError, checkout};
use super::schema::{categories, list_items, top_ten_lists, users, votes};

/// Number of items included in browse previews.
const PREVIEW_ITEMS: usize = 3;

/// Diesel-backed implementation of the list repository port.
#[derive(Clone)]
pub struct DieselListRepository {
    pool: DbPool,
}

impl DieselListRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ListPersistenceError {
    map_basic_pool_error(error, |message| ListPersistenceError::Connection { message })
}

impl From<diesel::result::Error> for ListPersistenceError {
    fn from(error: diesel::result::Error) -> Self {
        if unique_violation(&error).is_some_and(|constraint| constraint.contains("slug")) {
            return Self::SlugConflict;
        }
        map_basic_diesel_error(
            error,
            |message| Self::query(message),
            |message| Self::connection(message),
        )
    }
}

fn parse_owner(row: OwnerRow) -> Result<ListOwner, ListPersistenceError> {
    let username = Username::parse(&row.username)
        .map_err(|err| ListPersistenceError::query(format!("stored username invalid: {err}")))?;
    Ok(ListOwner {
        id: UserId::from(row.id),
        username,
    })
}

fn row_to_list(row: ListRow) -> List {
    List {
        id: ListId::from(row.id),
        title: row.title,
        description: row.description,
        slug: row.slug,
        is_public: row.is_public,
        user_id: UserId::from(row.user_id),
        category_id: CategoryId::from(row.category_id),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn item_rows<'a>(list_id: Uuid, items: &'a [crate::domain::NewListItem]) -> Result<Vec<NewListItemRow<'a>>, ListPersistenceError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let rank = i32::try_from(index + 1)
                .map_err(|_| ListPersistenceError::query("item rank overflow"))?;
            Ok(NewListItemRow {
                id: Uuid::new_v4(),
                list_id,
                rank,
                title: item.title.as_str(),
                description: item.description.as_deref(),
            })
        })
        .collect()
}

/// Hydrate a list row with owner, category, items, and vote count.
async fn load_detail(
    conn: &mut AsyncPgConnection,
    row: ListRow,
) -> Result<ListDetail, ListPersistenceError> {
    let owner: OwnerRow = users::table
        .find(row.user_id)
        .select(OwnerRow::as_select())
        .first(conn)
        .await?;
    let category: CategoryRow = categories::table
        .find(row.category_id)
        .select(CategoryRow::as_select())
        .first(conn)
        .await?;
    let items: Vec<ListItemRow> = list_items::table
        .filter(list_items::list_id.eq(row.id))
        .order(list_items::rank.asc())
        .select(ListItemRow::as_select())
        .load(conn)
        .await?;
    let vote_count: i64 = votes::table
        .filter(votes::list_id.eq(row.id))
        .count()
        .get_result(conn)
        .await?;

    Ok(ListDetail {
        id: ListId::from(row.id),
        title: row.title,
        description: row.description,
        slug: row.slug,
        is_public: row.is_public,
        user: parse_owner(owner)?,
        category: row_to_category(category),
        items: items
            .into_iter()
            .map(|item| ListItem {
                rank: item.rank,
                title: item.title,
                description: item.description,
            })
            .collect(),
        vote_count,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(QueryableByName)]
struct BrowseRow {
    #[diesel(sql_type = SqlUuid)]
    id: Uuid,
    #[diesel(sql_type = VarChar)]
    title: String,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = VarChar)]
    slug: String,
    #[diesel(sql_type = Bool)]
    is_public: bool,
    #[diesel(sql_type = Timestamptz)]
    created_at: DateTime<Utc>,
    #[diesel(sql_type = SqlUuid)]
    owner_id: Uuid,
    #[diesel(sql_type = VarChar)]
    owner_username: String,
    #[diesel(sql_type = SqlUuid)]
    category_id: Uuid,
    #[diesel(sql_type = VarChar)]
    category_name: String,
    #[diesel(sql_type = VarChar)]
    category_slug: String,
    #[diesel(sql_type = Nullable<Text>)]
    category_description: Option<String>,
    #[diesel(sql_type = Nullable<VarChar>)]
    category_icon: Option<String>,
    #[diesel(sql_type = BigInt)]
    vote_count: i64,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

const BROWSE_SQL: &str = "\
SELECT l.id, l.title, l.description, l.slug, l.is_public, l.created_at, \
       u.id AS owner_id, u.username AS owner_username, \
       c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
       c.description AS category_description, c.icon AS category_icon, \
       COALESCE(v.vote_count, 0) AS vote_count \
FROM top_ten_lists l \
JOIN users u ON u.id = l.user_id \
JOIN categories c ON c.id = l.category_id \
LEFT JOIN (SELECT list_id, COUNT(*) AS vote_count FROM votes GROUP BY list_id) v \
       ON v.list_id = l.id \
WHERE (l.is_public OR $1) \
  AND ($2::uuid IS NULL OR l.user_id = $2) \
  AND ($3::varchar IS NULL OR c.slug = $3) \
ORDER BY vote_count DESC, l.created_at DESC \
LIMIT $4 OFFSET $5";

const BROWSE_COUNT_SQL: &str = "\
SELECT COUNT(*) AS total \
FROM top_ten_lists l \
JOIN categories c ON c.id = l.category_id \
WHERE (l.is_public OR $1) \
  AND ($2::uuid IS NULL OR l.user_id = $2) \
  AND ($3::varchar IS NULL OR c.slug = $3)";

fn browse_row_to_summary(row: BrowseRow) -> Result<ListSummary, ListPersistenceError> {
    let owner = parse_owner(OwnerRow {
        id: row.owner_id,
        username: row.owner_username,
    })?;
    Ok(ListSummary {
        id: ListId::from(row.id),
        title: row.title,
        description: row.description,
        slug: row.slug,
        is_public: row.is_public,
        user: owner,
        category: Category {
            id: CategoryId::from(row.category_id),
            name: row.category_name,
            slug: row.category_slug,
            description: row.category_description,
            icon: row.category_icon,
        },
        items: Vec::new(),
        vote_count: row.vote_count,
        created_at: row.created_at,
    })
}

#[async_trait]
impl ListRepository for DieselListRepository {
    async fn find_by_id(&self, id: &ListId) -> Result<Option<List>, ListPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = top_ten_lists::table
            .find(*id.as_uuid())
            .select(ListRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(row_to_list))
    }

    async fn find_detail(&self, key: &str) -> Result<Option<ListDetail>, ListPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: Option<ListRow> = match Uuid::parse_str(key) {
            Ok(id) => {
                top_ten_lists::table
                    .filter(top_ten_lists::id.eq(id).or(top_ten_lists::slug.eq(key)))
                    .select(ListRow::as_select())
                    .first(&mut conn)
                    .await
                    .optional()?
            }
            Err(_) => {
                top_ten_lists::table
                    .filter(top_ten_lists::slug.eq(key))
                    .select(ListRow::as_select())
                    .first(&mut conn)
                    .await
                    .optional()?
            }
        };
        match row {
            Some(row) => Ok(Some(load_detail(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, new_list: NewList) -> Result<ListDetail, ListPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let row: ListRow = diesel::insert_into(top_ten_lists::table)
                    .values(NewListRow {
                        id: Uuid::new_v4(),
                        title: new_list.title.as_str(),
                        description: new_list.description.as_deref(),
                        slug: new_list.slug.as_str(),
                        is_public: new_list.is_public,
                        user_id: *new_list.user_id.as_uuid(),
                        category_id: *new_list.category_id.as_uuid(),
                    })
                    .returning(ListRow::as_select())
                    .get_result(conn)
                    .await?;

                let rows = item_rows(row.id, &new_list.items)?;
                diesel::insert_into(list_items::table)
                    .values(&rows)
                    .execute(conn)
                    .await?;

                load_detail(conn, row).await
            }
            .scope_boxed()
        })
        .await
    }

    async fn update(
        &self,
        id: &ListId,
        changes: ListChanges,
    ) -> Result<ListDetail, ListPersistenceError> {
        let ListChanges {
            title,
            description,
            category_id,
            is_public,
            items,
        } = changes;
        let list_uuid = *id.as_uuid();

        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let row: ListRow = diesel::update(top_ten_lists::table.find(list_uuid))
                    .set(ListChangesRow {
                        title,
                        description,
                        category_id: category_id.map(|id| *id.as_uuid()),
                        is_public,
                        updated_at: Utc::now(),
                    })
                    .returning(ListRow::as_select())
                    .get_result(conn)
                    .await?;

                if let Some(items) = items {
                    diesel::delete(list_items::table.filter(list_items::list_id.eq(list_uuid)))
                        .execute(conn)
                        .await?;
                    let rows = item_rows(list_uuid, &items)?;
                    diesel::insert_into(list_items::table)
                        .values(&rows)
                        .execute(conn)
                        .await?;
                }

                load_detail(conn, row).await
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete(&self, id: &ListId) -> Result<(), ListPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        diesel::delete(top_ten_lists::table.find(*id.as_uuid()))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn browse(
        &self,
        filter: &BrowseFilter,
    ) -> Result<Page<ListSummary>, ListPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let user_filter = filter.user_id.map(|id| *id.as_uuid());
        let category_filter = filter.category_slug.clone();

        let rows: Vec<BrowseRow> = diesel::sql_query(BROWSE_SQL)
            .bind::<Bool, _>(filter.include_private)
            .bind::<Nullable<SqlUuid>, _>(user_filter)
            .bind::<Nullable<VarChar>, _>(category_filter.clone())
            .bind::<BigInt, _>(i64::from(filter.per_page))
            .bind::<BigInt, _>(filter.offset())
            .load(&mut conn)
            .await?;

        let total: CountRow = diesel::sql_query(BROWSE_COUNT_SQL)
            .bind::<Bool, _>(filter.include_private)
            .bind::<Nullable<SqlUuid>, _>(user_filter)
            .bind::<Nullable<VarChar>, _>(category_filter)
            .get_result(&mut conn)
            .await?;

        let mut summaries = rows
            .into_iter()
            .map(browse_row_to_summary)
            .collect::<Result<Vec<_>, _>>()?;

        // One batched preview query rather than one per list.
        let ids: Vec<Uuid> = summaries.iter().map(|s| *s.id.as_uuid()).collect();
        if !ids.is_empty() {
            let preview: Vec<ListItemRow> = list_items::table
                .filter(list_items::list_id.eq_any(&ids))
                .order((list_items::list_id.asc(), list_items::rank.asc()))
                .select(ListItemRow::as_select())
                .load(&mut conn)
                .await?;
            for item in preview {
                if let Some(summary) = summaries
                    .iter_mut()
                    .find(|s| s.id.as_uuid() == &item.list_id)
                    && summary.items.len() < PREVIEW_ITEMS
                {
                    summary.items.push(ListItem {
                        rank: item.rank,
                        title: item.title,
                        description: item.description,
                    });
                }
            }
        }

        Ok(Page::new(
            summaries,
            filter.page,
            filter.per_page,
            total.total,
        ))
    }
}

//! List CRUD service.
//!
//! Standard plumbing around the list repository: ownership checks, item
//! bounds, and the category/slug derivations that feed the vote invariant.

use std::sync::Arc;

use tracing::error;

use super::ApiResult;
use super::catalogue::{CategoryId, CategorySummary};
use super::credentials::generate_unique_slug;
use super::error::Error;
use super::list::{
    BrowseFilter, ListChanges, ListDetail, ListId, ListSummary, MAX_ITEMS, NewList, NewListItem,
    Page,
};
use super::ports::{
    CataloguePersistenceError, CategoryRepository, ListPersistenceError, ListRepository,
};
use super::user::UserId;

/// Fields a caller supplies to create a list.
#[derive(Debug, Clone)]
pub struct CreateListRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub is_public: bool,
    pub items: Vec<NewListItem>,
}

/// List CRUD service over the list and category repositories.
#[derive(Clone)]
pub struct ListService {
    lists: Arc<dyn ListRepository>,
    categories: Arc<dyn CategoryRepository>,
}

fn map_list_error(error: ListPersistenceError) -> Error {
    match error {
        ListPersistenceError::Connection { message } => {
            error!(%message, "list repository unavailable");
            Error::service_unavailable(message)
        }
        ListPersistenceError::Query { message } => {
            error!(%message, "list repository query failed");
            Error::internal(message)
        }
        ListPersistenceError::SlugConflict => {
            // Six random base-36 characters colliding is vanishingly rare;
            // surface it as a generic failure rather than retrying forever.
            error!("list slug collision");
            Error::internal("list slug collision")
        }
    }
}

fn map_catalogue_error(error: CataloguePersistenceError) -> Error {
    match error {
        CataloguePersistenceError::Connection { message } => {
            error!(%message, "catalogue repository unavailable");
            Error::service_unavailable(message)
        }
        CataloguePersistenceError::Query { message } => {
            error!(%message, "catalogue repository query failed");
            Error::internal(message)
        }
    }
}

impl ListService {
    /// Create a new service over the given repositories.
    pub fn new(lists: Arc<dyn ListRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { lists, categories }
    }

    /// The read-only category catalogue with list counts.
    pub async fn list_categories(&self) -> ApiResult<Vec<CategorySummary>> {
        self.categories
            .list_with_counts()
            .await
            .map_err(map_catalogue_error)
    }

    /// Create a list owned by `user_id`.
    pub async fn create_list(
        &self,
        user_id: &UserId,
        request: CreateListRequest,
    ) -> ApiResult<ListDetail> {
        if request.title.trim().is_empty() {
            return Err(Error::invalid_request("Title and category are required"));
        }
        validate_items(&request.items, true)?;

        if self
            .categories
            .find_by_id(&request.category_id)
            .await
            .map_err(map_catalogue_error)?
            .is_none()
        {
            return Err(Error::invalid_request("Invalid category"));
        }

        let slug = generate_unique_slug(&request.title);
        self.lists
            .create(NewList {
                title: request.title,
                description: request.description,
                slug,
                is_public: request.is_public,
                user_id: *user_id,
                category_id: request.category_id,
                items: request.items,
            })
            .await
            .map_err(map_list_error)
    }

    /// Update a list the caller owns. When `changes.items` is present the
    /// full item set is replaced in one transaction.
    pub async fn update_list(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        changes: ListChanges,
    ) -> ApiResult<ListDetail> {
        let list = self.require_owned(user_id, list_id, "You can only edit your own lists").await?;

        if let Some(items) = &changes.items {
            validate_items(items, false)?;
        }
        if let Some(category_id) = &changes.category_id
            && self
                .categories
                .find_by_id(category_id)
                .await
                .map_err(map_catalogue_error)?
                .is_none()
        {
            return Err(Error::invalid_request("Invalid category"));
        }

        self.lists
            .update(&list.id, changes)
            .await
            .map_err(map_list_error)
    }

    /// Delete a list the caller owns. Items and votes cascade with it.
    pub async fn delete_list(&self, user_id: &UserId, list_id: &ListId) -> ApiResult<()> {
        let list = self
            .require_owned(user_id, list_id, "You can only delete your own lists")
            .await?;
        self.lists.delete(&list.id).await.map_err(map_list_error)
    }

    /// Fetch one list by id or slug.
    ///
    /// Private lists are visible only to their owner and are reported as
    /// not found to everyone else, so their existence does not leak.
    pub async fn get_list(&self, key: &str, viewer: Option<&UserId>) -> ApiResult<ListDetail> {
        let Some(detail) = self.lists.find_detail(key).await.map_err(map_list_error)? else {
            return Err(Error::not_found("List not found"));
        };
        if !detail.is_public && viewer != Some(&detail.user.id) {
            return Err(Error::not_found("List not found"));
        }
        Ok(detail)
    }

    /// Page through lists, ordered by vote count then recency.
    ///
    /// Private lists appear only when the viewer browses their own lists.
    pub async fn browse_lists(
        &self,
        mut filter: BrowseFilter,
        viewer: Option<&UserId>,
    ) -> ApiResult<Page<ListSummary>> {
        filter.include_private = match (&filter.user_id, viewer) {
            (Some(owner), Some(viewer)) => owner == viewer,
            _ => false,
        };
        self.lists
            .browse(&filter.normalised())
            .await
            .map_err(map_list_error)
    }

    async fn require_owned(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        denial: &str,
    ) -> ApiResult<super::list::List> {
        let Some(list) = self
            .lists
            .find_by_id(list_id)
            .await
            .map_err(map_list_error)?
        else {
            return Err(Error::not_found("List not found"));
        };
        if &list.user_id != user_id {
            return Err(Error::forbidden(denial));
        }
        Ok(list)
    }
}

fn validate_items(items: &[NewListItem], require_some: bool) -> ApiResult<()> {
    if require_some && items.is_empty() {
        return Err(Error::invalid_request("At least one list item is required"));
    }
    if items.len() > MAX_ITEMS {
        return Err(Error::invalid_request("Maximum 10 items allowed per list"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for ownership and validation rules.
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::domain::catalogue::Category;
    use crate::domain::error::ErrorCode;
    use crate::domain::list::{List, ListItem, ListOwner};
    use crate::domain::user::Username;

    #[derive(Default)]
    struct StubState {
        lists: Vec<List>,
        details: Vec<ListDetail>,
        deleted: Vec<ListId>,
    }

    struct StubListRepository {
        state: Mutex<StubState>,
    }

    impl StubListRepository {
        fn new(lists: Vec<List>, details: Vec<ListDetail>) -> Self {
            Self {
                state: Mutex::new(StubState {
                    lists,
                    details,
                    deleted: Vec::new(),
                }),
            }
        }
    }

    #[async_trait]
    impl ListRepository for StubListRepository {
        async fn find_by_id(&self, id: &ListId) -> Result<Option<List>, ListPersistenceError> {
            let state = self.state.lock().expect("state lock");
            Ok(state.lists.iter().find(|l| &l.id == id).cloned())
        }

        async fn find_detail(
            &self,
            key: &str,
        ) -> Result<Option<ListDetail>, ListPersistenceError> {
            let state = self.state.lock().expect("state lock");
            Ok(state
                .details
                .iter()
                .find(|d| d.id.to_string() == key || d.slug == key)
                .cloned())
        }

        async fn create(&self, new_list: NewList) -> Result<ListDetail, ListPersistenceError> {
            let now = Utc::now();
            let detail = ListDetail {
                id: ListId::random(),
                title: new_list.title,
                description: new_list.description,
                slug: new_list.slug,
                is_public: new_list.is_public,
                user: ListOwner {
                    id: new_list.user_id,
                    username: Username::parse("stub-owner").expect("valid username"),
                },
                category: category(new_list.category_id),
                items: new_list
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| ListItem {
                        rank: i32::try_from(index).unwrap_or(i32::MAX - 1) + 1,
                        title: item.title.clone(),
                        description: item.description.clone(),
                    })
                    .collect(),
                vote_count: 0,
                created_at: now,
                updated_at: now,
            };
            self.state
                .lock()
                .expect("state lock")
                .details
                .push(detail.clone());
            Ok(detail)
        }

        async fn update(
            &self,
            id: &ListId,
            changes: ListChanges,
        ) -> Result<ListDetail, ListPersistenceError> {
            let state = self.state.lock().expect("state lock");
            let mut detail = state
                .details
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .ok_or_else(|| ListPersistenceError::query("record not found"))?;
            if let Some(title) = changes.title {
                detail.title = title;
            }
            Ok(detail)
        }

        async fn delete(&self, id: &ListId) -> Result<(), ListPersistenceError> {
            self.state.lock().expect("state lock").deleted.push(*id);
            Ok(())
        }

        async fn browse(
            &self,
            _filter: &BrowseFilter,
        ) -> Result<Page<ListSummary>, ListPersistenceError> {
            Ok(Page::new(Vec::new(), 1, 12, 0))
        }
    }

    struct StubCategories {
        known: Vec<CategoryId>,
    }

    #[async_trait]
    impl CategoryRepository for StubCategories {
        async fn list_with_counts(
            &self,
        ) -> Result<Vec<CategorySummary>, CataloguePersistenceError> {
            Ok(Vec::new())
        }

        async fn find_by_id(
            &self,
            id: &CategoryId,
        ) -> Result<Option<Category>, CataloguePersistenceError> {
            Ok(self.known.contains(id).then(|| category(*id)))
        }

        async fn seed_catalogue(&self) -> Result<(), CataloguePersistenceError> {
            Ok(())
        }
    }

    fn category(id: CategoryId) -> Category {
        Category {
            id,
            name: "Movies".into(),
            slug: "movies".into(),
            description: None,
            icon: None,
        }
    }

    fn make_list(owner: UserId, category_id: CategoryId, is_public: bool) -> List {
        let now = Utc::now();
        List {
            id: ListId::random(),
            title: "Best Movies".into(),
            description: None,
            slug: "best-movies-abc123".into(),
            is_public,
            user_id: owner,
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn detail_of(list: &List) -> ListDetail {
        ListDetail {
            id: list.id,
            title: list.title.clone(),
            description: list.description.clone(),
            slug: list.slug.clone(),
            is_public: list.is_public,
            user: ListOwner {
                id: list.user_id,
                username: Username::parse("owner").expect("valid username"),
            },
            category: category(list.category_id),
            items: Vec::new(),
            vote_count: 0,
            created_at: list.created_at,
            updated_at: list.updated_at,
        }
    }

    fn items(count: usize) -> Vec<NewListItem> {
        (0..count)
            .map(|i| NewListItem {
                title: format!("Item {i}"),
                description: None,
            })
            .collect()
    }

    fn service_with(lists: Vec<List>, known_category: CategoryId) -> ListService {
        let details = lists.iter().map(detail_of).collect();
        ListService::new(
            Arc::new(StubListRepository::new(lists, details)),
            Arc::new(StubCategories {
                known: vec![known_category],
            }),
        )
    }

    #[tokio::test]
    async fn create_validates_title_items_and_category() {
        let category_id = CategoryId::random();
        let svc = service_with(Vec::new(), category_id);
        let owner = UserId::random();

        let err = svc
            .create_list(
                &owner,
                CreateListRequest {
                    title: "  ".into(),
                    description: None,
                    category_id,
                    is_public: true,
                    items: items(1),
                },
            )
            .await
            .expect_err("blank title");
        assert_eq!(err.code, ErrorCode::InvalidRequest);

        let err = svc
            .create_list(
                &owner,
                CreateListRequest {
                    title: "Best".into(),
                    description: None,
                    category_id,
                    is_public: true,
                    items: items(0),
                },
            )
            .await
            .expect_err("no items");
        assert_eq!(err.code, ErrorCode::InvalidRequest);

        let err = svc
            .create_list(
                &owner,
                CreateListRequest {
                    title: "Best".into(),
                    description: None,
                    category_id,
                    is_public: true,
                    items: items(11),
                },
            )
            .await
            .expect_err("too many items");
        assert_eq!(err.code, ErrorCode::InvalidRequest);

        let err = svc
            .create_list(
                &owner,
                CreateListRequest {
                    title: "Best".into(),
                    description: None,
                    category_id: CategoryId::random(),
                    is_public: true,
                    items: items(1),
                },
            )
            .await
            .expect_err("unknown category");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn create_assigns_ranks_and_unique_slug() {
        let category_id = CategoryId::random();
        let svc = service_with(Vec::new(), category_id);
        let detail = svc
            .create_list(
                &UserId::random(),
                CreateListRequest {
                    title: "Best Movies".into(),
                    description: None,
                    category_id,
                    is_public: true,
                    items: items(3),
                },
            )
            .await
            .expect("create succeeds");

        assert!(detail.slug.starts_with("best-movies-"));
        assert_eq!(
            detail.items.iter().map(|i| i.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn update_and_delete_require_ownership() {
        let owner = UserId::random();
        let stranger = UserId::random();
        let category_id = CategoryId::random();
        let list = make_list(owner, category_id, true);
        let svc = service_with(vec![list.clone()], category_id);

        let err = svc
            .update_list(&stranger, &list.id, ListChanges::default())
            .await
            .expect_err("stranger cannot edit");
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = svc
            .delete_list(&stranger, &list.id)
            .await
            .expect_err("stranger cannot delete");
        assert_eq!(err.code, ErrorCode::Forbidden);

        svc.delete_list(&owner, &list.id)
            .await
            .expect("owner deletes");
    }

    #[tokio::test]
    async fn private_lists_read_as_missing_to_non_owners() {
        let owner = UserId::random();
        let category_id = CategoryId::random();
        let list = make_list(owner, category_id, false);
        let svc = service_with(vec![list.clone()], category_id);

        let err = svc
            .get_list(&list.id.to_string(), None)
            .await
            .expect_err("anonymous viewer");
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = svc
            .get_list(&list.id.to_string(), Some(&UserId::random()))
            .await
            .expect_err("other viewer");
        assert_eq!(err.code, ErrorCode::NotFound);

        let detail = svc
            .get_list(&list.id.to_string(), Some(&owner))
            .await
            .expect("owner sees private list");
        assert_eq!(detail.id, list.id);
    }
}

//! List CRUD HTTP handlers.

use actix_web::{delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::list_service::CreateListRequest;
use crate::domain::{
    ApiResult, BrowseFilter, CategoryId, Error, ListChanges, ListDetail, ListId, ListSummary,
    NewListItem, Page,
};

use super::session::SessionContext;
use super::state::HttpState;

/// Browse query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    /// Category slug filter.
    pub category: Option<String>,
    /// Restrict to one owner's lists (dashboard view).
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Pagination block mirrored into browse responses.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// `data` payload for browse responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListsData {
    pub lists: Vec<ListSummary>,
    pub pagination: Pagination,
}

/// Envelope for browse responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListsResponse {
    pub success: bool,
    pub data: ListsData,
}

/// `data` payload for single-list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListData {
    pub list: ListDetail,
}

/// Envelope for single-list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    pub success: bool,
    pub data: ListData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Envelope for acknowledgement-only responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListDeletedResponse {
    pub success: bool,
    pub message: String,
}

/// Create-list payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub items: Option<Vec<NewListItem>>,
}

/// Update-list payload. Absent fields keep their current value; a supplied
/// `items` array replaces the full item set.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub items: Option<Vec<NewListItem>>,
}

fn list_response(list: ListDetail, message: Option<&str>) -> web::Json<ListResponse> {
    web::Json(ListResponse {
        success: true,
        data: ListData { list },
        message: message.map(str::to_owned),
    })
}

fn paginated(page: Page<ListSummary>) -> web::Json<ListsResponse> {
    web::Json(ListsResponse {
        success: true,
        data: ListsData {
            pagination: Pagination {
                page: page.page,
                limit: page.per_page,
                total: page.total,
                total_pages: page.total_pages,
            },
            lists: page.items,
        },
    })
}

/// Browse lists, ordered by vote count then recency.
#[utoipa::path(
    get,
    path = "/api/lists",
    params(BrowseQuery),
    responses((status = 200, description = "One page of lists", body = ListsResponse)),
    tags = ["lists"],
    operation_id = "browseLists"
)]
#[get("/lists")]
pub async fn browse_lists(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<BrowseQuery>,
) -> ApiResult<web::Json<ListsResponse>> {
    let query = query.into_inner();
    let filter = BrowseFilter {
        category_slug: query.category,
        user_id: query.user_id.map(Into::into),
        include_private: false,
        page: query.page.unwrap_or(1),
        per_page: query.limit.unwrap_or(BrowseFilter::DEFAULT_PER_PAGE),
    };
    let viewer = session.user_id();
    let page = state.lists.browse_lists(filter, viewer.as_ref()).await?;
    Ok(paginated(page))
}

/// Create a list owned by the session user.
#[utoipa::path(
    post,
    path = "/api/lists",
    request_body = CreateListBody,
    responses(
        (status = 200, description = "List created", body = ListResponse),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Not logged in")
    ),
    tags = ["lists"],
    operation_id = "createList"
)]
#[post("/lists")]
pub async fn create_list(
    state: web::Data<HttpState>,
    session: SessionContext,
    body: web::Json<CreateListBody>,
) -> ApiResult<web::Json<ListResponse>> {
    let user_id = session.require_user("You must be logged in to create a list")?;
    let body = body.into_inner();

    let (Some(title), Some(category_id)) = (body.title, body.category_id) else {
        return Err(Error::invalid_request("Title and category are required"));
    };
    let items = body.items.unwrap_or_default();

    let detail = state
        .lists
        .create_list(
            &user_id,
            CreateListRequest {
                title,
                description: body.description,
                category_id: CategoryId::from(category_id),
                // Lists are public unless explicitly made private.
                is_public: body.is_public.unwrap_or(true),
                items,
            },
        )
        .await?;
    Ok(list_response(detail, Some("List created successfully")))
}

/// Fetch one list by id or slug.
#[utoipa::path(
    get,
    path = "/api/lists/{key}",
    params(("key" = String, Path, description = "List id or slug")),
    responses(
        (status = 200, description = "The list", body = ListResponse),
        (status = 404, description = "Missing, or private and not owned by the caller")
    ),
    tags = ["lists"],
    operation_id = "getList"
)]
#[get("/lists/{key}")]
pub async fn get_list(
    state: web::Data<HttpState>,
    session: SessionContext,
    key: web::Path<String>,
) -> ApiResult<web::Json<ListResponse>> {
    let viewer = session.user_id();
    let detail = state.lists.get_list(&key, viewer.as_ref()).await?;
    Ok(list_response(detail, None))
}

/// Update a list the session user owns.
#[utoipa::path(
    put,
    path = "/api/lists/{id}",
    request_body = UpdateListBody,
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 200, description = "Updated list", body = ListResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Unknown list")
    ),
    tags = ["lists"],
    operation_id = "updateList"
)]
#[put("/lists/{id}")]
pub async fn update_list(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<Uuid>,
    body: web::Json<UpdateListBody>,
) -> ApiResult<web::Json<ListResponse>> {
    let user_id = session.require_user("You must be logged in")?;
    let body = body.into_inner();
    let changes = ListChanges {
        title: body.title,
        description: body.description.map(Some),
        category_id: body.category_id.map(Into::into),
        is_public: body.is_public,
        items: body.items,
    };
    let detail = state
        .lists
        .update_list(&user_id, &ListId::from(*id), changes)
        .await?;
    Ok(list_response(detail, Some("List updated successfully")))
}

/// Delete a list the session user owns. Items and votes cascade with it.
#[utoipa::path(
    delete,
    path = "/api/lists/{id}",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 200, description = "Deleted", body = ListDeletedResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Unknown list")
    ),
    tags = ["lists"],
    operation_id = "deleteList"
)]
#[delete("/lists/{id}")]
pub async fn delete_list(
    state: web::Data<HttpState>,
    session: SessionContext,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<ListDeletedResponse>> {
    let user_id = session.require_user("You must be logged in")?;
    state
        .lists
        .delete_list(&user_id, &ListId::from(*id))
        .await?;
    Ok(web::Json(ListDeletedResponse {
        success: true,
        message: "List deleted successfully".to_owned(),
    }))
}

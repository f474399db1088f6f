//! Category catalogue HTTP handler.

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ApiResult, CategorySummary};

use super::state::HttpState;

/// `data` payload listing the catalogue.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesData {
    pub categories: Vec<CategorySummary>,
}

/// Envelope for the catalogue endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub success: bool,
    pub data: CategoriesData,
}

/// The fixed category catalogue with per-category list counts.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = CategoriesResponse)),
    tags = ["categories"],
    operation_id = "listCategories"
)]
#[get("/categories")]
pub async fn list_categories(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<CategoriesResponse>> {
    let categories = state.lists.list_categories().await?;
    Ok(web::Json(CategoriesResponse {
        success: true,
        data: CategoriesData { categories },
    }))
}

//! OpenAPI documentation assembly.

use utoipa::OpenApi;

use crate::domain::auth_service::IssuedReset;
use crate::domain::{
    AuthProvider, Category, CategorySummary, Error, ErrorCode, ListDetail, ListItem, ListOwner,
    ListSummary, NewListItem, PublicUser, VoteDetail,
};
use crate::inbound::http::{auth, categories, lists, votes};

/// Public OpenAPI surface used by Swagger UI and tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "topten backend",
        description = "Create, browse, and vote on top-ten themed lists."
    ),
    paths(
        auth::signup,
        auth::login,
        auth::logout,
        auth::me,
        auth::reset_password,
        auth::google_initiate,
        auth::google_callback,
        categories::list_categories,
        lists::browse_lists,
        lists::create_list,
        lists::get_list,
        lists::update_list,
        lists::delete_list,
        votes::list_votes,
        votes::cast_vote,
        votes::remove_vote,
    ),
    components(schemas(
        Error,
        ErrorCode,
        AuthProvider,
        PublicUser,
        IssuedReset,
        auth::SignupRequest,
        auth::LoginRequest,
        auth::ResetPasswordRequest,
        auth::UserResponse,
        auth::UserData,
        auth::MessageResponse,
        auth::ResetPasswordResponse,
        Category,
        CategorySummary,
        categories::CategoriesResponse,
        categories::CategoriesData,
        ListItem,
        ListOwner,
        ListDetail,
        ListSummary,
        NewListItem,
        lists::CreateListBody,
        lists::UpdateListBody,
        lists::ListsResponse,
        lists::ListsData,
        lists::Pagination,
        lists::ListResponse,
        lists::ListData,
        lists::ListDeletedResponse,
        VoteDetail,
        votes::CastVoteBody,
        votes::VotesResponse,
        votes::VotesData,
        votes::CastVoteResponse,
        votes::CastVoteData,
        votes::RemoveVoteResponse,
    ))
)]
pub struct ApiDoc;

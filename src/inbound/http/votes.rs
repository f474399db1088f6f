//! Voting HTTP handlers.

use actix_web::{delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{ApiResult, Error, ListId, VoteDetail};

use super::session::SessionContext;
use super::state::HttpState;

/// Cast-vote payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteBody {
    pub list_id: Option<Uuid>,
}

/// Remove-vote query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVoteQuery {
    pub list_id: Option<Uuid>,
}

/// `data` payload listing the caller's votes.
#[derive(Debug, Serialize, ToSchema)]
pub struct VotesData {
    pub votes: Vec<VoteDetail>,
}

/// Envelope for the vote listing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct VotesResponse {
    pub success: bool,
    pub data: VotesData,
}

/// `data` payload confirming which list now holds the vote.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteData {
    #[schema(value_type = String)]
    pub voted_list_id: ListId,
}

/// Envelope for cast-vote responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct CastVoteResponse {
    pub success: bool,
    pub message: String,
    pub data: CastVoteData,
}

/// Envelope for remove-vote responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveVoteResponse {
    pub success: bool,
    pub message: String,
}

/// The caller's votes with list and category context.
///
/// Anonymous callers get an empty collection rather than a challenge, so
/// browse pages can render vote state without a login round trip.
#[utoipa::path(
    get,
    path = "/api/votes",
    responses((status = 200, description = "The caller's votes", body = VotesResponse)),
    tags = ["votes"],
    operation_id = "listVotesForUser"
)]
#[get("/votes")]
pub async fn list_votes(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<VotesResponse>> {
    let votes = match session.user_id() {
        Some(user_id) => state.votes.list_votes_for_user(&user_id).await?,
        None => Vec::new(),
    };
    Ok(web::Json(VotesResponse {
        success: true,
        data: VotesData { votes },
    }))
}

/// Cast a vote, switching any existing vote in the list's category.
#[utoipa::path(
    post,
    path = "/api/votes",
    request_body = CastVoteBody,
    responses(
        (status = 200, description = "Vote recorded or switched", body = CastVoteResponse),
        (status = 400, description = "Missing list id or private list"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Unknown list"),
        (status = 409, description = "Already voted for this list")
    ),
    tags = ["votes"],
    operation_id = "castVote"
)]
#[post("/votes")]
pub async fn cast_vote(
    state: web::Data<HttpState>,
    session: SessionContext,
    body: web::Json<CastVoteBody>,
) -> ApiResult<web::Json<CastVoteResponse>> {
    let user_id = session.require_user("You must be logged in to vote")?;
    let Some(list_id) = body.list_id else {
        return Err(Error::invalid_request("List ID is required"));
    };
    let list_id = ListId::from(list_id);

    let outcome = state.votes.cast_vote(&user_id, &list_id).await?;
    Ok(web::Json(CastVoteResponse {
        success: true,
        message: outcome.message(),
        data: CastVoteData {
            voted_list_id: list_id,
        },
    }))
}

/// Remove the caller's vote for a list.
#[utoipa::path(
    delete,
    path = "/api/votes",
    params(RemoveVoteQuery),
    responses(
        (status = 200, description = "Vote removed", body = RemoveVoteResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such vote")
    ),
    tags = ["votes"],
    operation_id = "removeVote"
)]
#[delete("/votes")]
pub async fn remove_vote(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<RemoveVoteQuery>,
) -> ApiResult<web::Json<RemoveVoteResponse>> {
    let user_id = session.require_user("You must be logged in")?;
    let Some(list_id) = query.list_id else {
        return Err(Error::invalid_request("List ID is required"));
    };

    state
        .votes
        .remove_vote(&user_id, &ListId::from(list_id))
        .await?;
    Ok(web::Json(RemoveVoteResponse {
        success: true,
        message: "Vote removed successfully".to_owned(),
    }))
}

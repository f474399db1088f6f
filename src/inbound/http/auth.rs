//! Authentication HTTP handlers.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::domain::auth_service::IssuedReset;
use crate::domain::ports::IdentityProviderError;
use crate::domain::{
    ApiResult, Error, LoginCredentials, PublicUser, SignupCredentials,
};

use super::session::SessionContext;
use super::state::HttpState;

const OAUTH_RETURN_COOKIE: &str = "oauth_return_url";
const DEFAULT_RETURN_URL: &str = "/dashboard";

/// Signup payload. Fields are optional so missing input produces the
/// domain's validation message instead of a deserialisation error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Password-reset request payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
}

/// Envelope for endpoints returning the authenticated user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub data: UserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `data` payload carrying the public user projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: PublicUser,
}

/// Envelope for endpoints returning only an acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Envelope for password-reset requests. `data` carries the issued link in
/// demo deployments where mail delivery is substituted by the response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<IssuedReset>,
}

fn user_response(user: PublicUser, message: Option<&str>) -> web::Json<UserResponse> {
    web::Json(UserResponse {
        success: true,
        data: UserData { user },
        message: message.map(str::to_owned),
    })
}

/// Register a local account and establish a session.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Duplicate email or username")
    ),
    tags = ["auth"],
    operation_id = "signup"
)]
#[post("/auth/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    session: SessionContext,
    body: web::Json<SignupRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let credentials = SignupCredentials::try_from_parts(
        body.email.as_deref().unwrap_or_default(),
        body.username.as_deref().unwrap_or_default(),
        body.password.as_deref().unwrap_or_default(),
    )
    .map_err(|err| Error::invalid_request(err.to_string()))?;

    let user = state.auth.signup(credentials).await?;
    session.log_in(&user)?;
    Ok(user_response(user, Some("Account created successfully")))
}

/// Authenticate with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserResponse),
        (status = 401, description = "Invalid credentials or federated-only account")
    ),
    tags = ["auth"],
    operation_id = "login"
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    body: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let credentials = LoginCredentials::try_from_parts(
        body.email.as_deref().unwrap_or_default(),
        body.password.as_deref().unwrap_or_default(),
    )
    .map_err(|err| Error::invalid_request(err.to_string()))?;

    let user = state.auth.login(credentials).await?;
    session.log_in(&user)?;
    Ok(user_response(user, Some("Logged in successfully")))
}

/// Destroy the current session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse)),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> web::Json<MessageResponse> {
    session.clear();
    web::Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_owned(),
    })
}

/// The currently authenticated user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Session references a deleted user")
    ),
    tags = ["auth"],
    operation_id = "currentUser"
)]
#[get("/auth/me")]
pub async fn me(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let user_id = session.require_user("Not authenticated")?;
    match state.auth.current_user(&user_id).await? {
        Some(user) => Ok(user_response(user, None)),
        None => {
            // The account is gone; the stale session goes with it.
            session.clear();
            Err(Error::not_found("User not found"))
        }
    }
}

/// Issue a password-reset token.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = ResetPasswordResponse)
    ),
    tags = ["auth"],
    operation_id = "requestPasswordReset"
)]
#[post("/auth/reset-password")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    body: web::Json<ResetPasswordRequest>,
) -> ApiResult<web::Json<ResetPasswordResponse>> {
    let issue = state
        .auth
        .request_password_reset(body.email.as_deref().unwrap_or_default())
        .await?;
    Ok(web::Json(ResetPasswordResponse {
        success: true,
        message: issue.message,
        data: issue.issued,
    }))
}

/// Query parameters for the OAuth initiation endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct InitiateQuery {
    /// Where to land after a successful login.
    pub return_url: Option<String>,
}

/// Query parameters Google appends to the callback redirect.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Only same-site paths are accepted as post-login return targets.
fn sanitize_return_url(candidate: Option<&str>) -> String {
    match candidate {
        Some(url) if url.starts_with('/') && !url.starts_with("//") => url.to_owned(),
        _ => DEFAULT_RETURN_URL.to_owned(),
    }
}

fn login_error_redirect(reason: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, format!("/auth/login?error={reason}")))
        .finish()
}

/// Redirect the browser to Google's consent screen.
#[utoipa::path(
    get,
    path = "/api/auth/google/initiate",
    params(InitiateQuery),
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 503, description = "Google sign-in not configured")
    ),
    tags = ["auth"],
    operation_id = "initiateFederatedLogin"
)]
#[get("/auth/google/initiate")]
pub async fn google_initiate(
    state: web::Data<HttpState>,
    query: web::Query<InitiateQuery>,
) -> ApiResult<HttpResponse> {
    let Some(provider) = state.identity.as_ref() else {
        return Err(Error::service_unavailable("Google sign-in is not configured"));
    };

    let return_url = sanitize_return_url(query.return_url.as_deref());
    let authorize = provider.authorization_url(&return_url);

    // Backup copy of the return URL in case the provider drops the state.
    let cookie = Cookie::build(OAUTH_RETURN_COOKIE, return_url)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(CookieDuration::minutes(10))
        .finish();

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, authorize))
        .cookie(cookie)
        .finish())
}

/// Complete the federated login after Google redirects back.
#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect to the return URL, or to the login page with an error reason")
    ),
    tags = ["auth"],
    operation_id = "completeFederatedLogin"
)]
#[get("/auth/google/callback")]
pub async fn google_callback(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    let Some(provider) = state.identity.as_ref() else {
        return login_error_redirect("oauth_not_configured");
    };
    if query.error.is_some() {
        return login_error_redirect("oauth_cancelled");
    }
    let Some(code) = query.code.as_deref() else {
        return login_error_redirect("oauth_failed");
    };

    let identity = match provider.resolve_code(code).await {
        Ok(identity) => identity,
        Err(IdentityProviderError::MissingFields) => {
            return login_error_redirect("oauth_missing_info");
        }
        Err(err) => {
            error!(error = %err, "authorization code exchange failed");
            return login_error_redirect("oauth_failed");
        }
    };

    let user = match state.auth.federated_login(identity).await {
        Ok(user) => user,
        Err(err) => {
            error!(error = %err, "federated login failed");
            return login_error_redirect("oauth_error");
        }
    };

    if let Err(err) = session.log_in(&user) {
        error!(error = %err, "session could not be established");
        return login_error_redirect("oauth_error");
    }

    let cookie_return = request
        .cookie(OAUTH_RETURN_COOKIE)
        .map(|c| c.value().to_owned());
    let return_url = sanitize_return_url(query.state.as_deref().or(cookie_return.as_deref()));

    let mut removal = Cookie::new(OAUTH_RETURN_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();

    HttpResponse::Found()
        .insert_header((header::LOCATION, return_url))
        .cookie(removal)
        .finish()
}

#[cfg(test)]
mod tests {
    //! Return-URL sanitisation coverage; full flows live in the
    //! integration suite.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, DEFAULT_RETURN_URL)]
    #[case(Some("/lists/best-movies"), "/lists/best-movies")]
    #[case(Some("https://evil.example"), DEFAULT_RETURN_URL)]
    #[case(Some("//evil.example"), DEFAULT_RETURN_URL)]
    #[case(Some(""), DEFAULT_RETURN_URL)]
    fn return_urls_are_confined_to_local_paths(
        #[case] candidate: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(sanitize_return_url(candidate), expected);
    }
}

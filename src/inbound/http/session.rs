//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Wraps the Actix cookie session in a typed payload. Reads fail open: an
//! absent or corrupt cookie yields a fresh logged-out payload, never an
//! error. Sessions are read at the start of a request and written at most
//! once per request; if a client races two mutating requests the last
//! writer wins, which is acceptable for this domain.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Error, PublicUser, UserId};

pub(crate) const SESSION_DATA_KEY: &str = "topten.session";

/// Typed session payload round-tripped in the encrypted cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_logged_in: bool,
}

/// Newtype wrapper exposing higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Current payload; logged out when the cookie is absent or unreadable.
    pub fn data(&self) -> SessionData {
        match self.0.get::<SessionData>(SESSION_DATA_KEY) {
            Ok(Some(data)) => data,
            Ok(None) => SessionData::default(),
            Err(error) => {
                warn!(%error, "unreadable session payload; treating as logged out");
                self.0.remove(SESSION_DATA_KEY);
                SessionData::default()
            }
        }
    }

    /// Populate and persist the payload for an authenticated user.
    pub fn log_in(&self, user: &PublicUser) -> Result<(), Error> {
        let data = SessionData {
            user_id: Some(user.id),
            username: Some(user.username.to_string()),
            email: Some(user.email.to_string()),
            is_logged_in: true,
        };
        self.0
            .insert(SESSION_DATA_KEY, data)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Destroy the session and emit a cookie-deletion instruction.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// The authenticated user's id, if any.
    pub fn user_id(&self) -> Option<UserId> {
        let data = self.data();
        if data.is_logged_in { data.user_id } else { None }
    }

    /// Require an authenticated user or fail with the given denial message.
    pub fn require_user(&self, denial: &str) -> Result<UserId, Error> {
        self.user_id().ok_or_else(|| Error::unauthorized(denial))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    //! Session payload round-trip coverage.
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use chrono::Utc;

    use super::*;
    use crate::domain::{Email, Username};
    use crate::inbound::http::test_utils::test_session_middleware;

    fn fixture_user() -> PublicUser {
        PublicUser {
            id: UserId::random(),
            email: Email::parse("ada@example.com").expect("valid email"),
            username: Username::parse("ada").expect("valid username"),
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn round_trips_the_session_payload() {
        let user = fixture_user();
        let expected_id = user.id;
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set",
                    web::get().to(move |session: SessionContext| {
                        let user = user.clone();
                        async move {
                            session.log_in(&user)?;
                            Ok::<_, Error>(HttpResponse::Ok().finish())
                        }
                    }),
                )
                .route(
                    "/get",
                    web::get().to(move |session: SessionContext| async move {
                        let data = session.data();
                        HttpResponse::Ok().json(data)
                    }),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .response()
            .cookies()
            .next()
            .expect("session cookie issued")
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/get")
            .cookie(cookie)
            .to_request();
        let data: SessionData = test::call_and_read_body_json(&app, req).await;
        assert!(data.is_logged_in);
        assert_eq!(data.user_id, Some(expected_id));
        assert_eq!(data.username.as_deref(), Some("ada"));
    }

    #[actix_web::test]
    async fn missing_cookie_reads_as_logged_out() {
        let app = test::init_service(App::new().wrap(test_session_middleware()).route(
            "/get",
            web::get().to(|session: SessionContext| async move {
                HttpResponse::Ok().json(session.data())
            }),
        ))
        .await;

        let data: SessionData =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/get").to_request())
                .await;
        assert_eq!(data, SessionData::default());
        assert!(!data.is_logged_in);
    }
}

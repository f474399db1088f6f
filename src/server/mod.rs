//! Server assembly: wires adapters into services and services into state.

pub mod config;

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::SameSite;
use actix_web::cookie::time::Duration as CookieDuration;

use crate::domain::ports::IdentityProvider;
use crate::domain::{AuthService, ListService, VoteService};
use crate::inbound::http::HttpState;
use crate::outbound::email::ConsoleMailer;
use crate::outbound::google::GoogleIdentityProvider;
use crate::outbound::persistence::{
    DbPool, DieselCategoryRepository, DieselListRepository, DieselUserRepository, DieselVoteStore,
};

pub use config::ServerConfig;

/// Session cookie lifetime: one week.
const SESSION_TTL_DAYS: i64 = 7;

impl ServerConfig {
    /// Build the cookie-backed session middleware.
    ///
    /// The cookie is HTTP-only and `SameSite=Lax`; the secure flag follows
    /// the deployment configuration. All session state round-trips in this
    /// cookie, so the server holds nothing between requests.
    pub fn session_middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name("topten_session".into())
            .cookie_path("/".into())
            .cookie_secure(self.cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .session_lifecycle(
                PersistentSession::default().session_ttl(CookieDuration::days(SESSION_TTL_DAYS)),
            )
            .build()
    }
}

/// Wire Diesel adapters into domain services and handler state.
pub fn build_state(pool: DbPool, config: &ServerConfig) -> HttpState {
    let users = Arc::new(DieselUserRepository::new(pool.clone()));
    let categories = Arc::new(DieselCategoryRepository::new(pool.clone()));
    let lists = Arc::new(DieselListRepository::new(pool.clone()));
    let votes = Arc::new(DieselVoteStore::new(pool));

    let auth = Arc::new(AuthService::new(
        users,
        Arc::new(ConsoleMailer),
        config.base_url.clone(),
    ));
    let list_service = Arc::new(ListService::new(lists.clone(), categories));
    let vote_service = Arc::new(VoteService::new(lists, votes));

    let identity = config
        .google
        .clone()
        .map(|google| Arc::new(GoogleIdentityProvider::new(google)) as Arc<dyn IdentityProvider>);

    HttpState::new(
        auth,
        list_service,
        vote_service,
        identity,
        config.cookie_secure,
    )
}

//! HTTP handlers translating requests into domain service calls.
//!
//! Handlers own request/response DTOs and the JSON envelope shape; business
//! rules live in the domain services. Everything here is mounted under the
//! `/api` scope by [`configure`].

pub mod auth;
pub mod categories;
pub mod lists;
pub mod session;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod votes;

use actix_web::web;

pub use session::{SessionContext, SessionData};
pub use state::HttpState;

/// Register every `/api` handler on the given service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::signup)
        .service(auth::login)
        .service(auth::logout)
        .service(auth::me)
        .service(auth::reset_password)
        .service(auth::google_initiate)
        .service(auth::google_callback)
        .service(categories::list_categories)
        .service(lists::browse_lists)
        .service(lists::create_list)
        .service(lists::get_list)
        .service(lists::update_list)
        .service(lists::delete_list)
        .service(votes::list_votes)
        .service(votes::cast_vote)
        .service(votes::remove_vote);
}

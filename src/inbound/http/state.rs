//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend only
//! on domain services and ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::IdentityProvider;
use crate::domain::{AuthService, ListService, VoteService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub auth: Arc<AuthService>,
    pub lists: Arc<ListService>,
    pub votes: Arc<VoteService>,
    /// Absent when Google sign-in is not configured; the OAuth endpoints
    /// then answer with a configuration error.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Mark adapter-issued cookies (e.g. the OAuth return-URL cookie) as
    /// secure. Mirrors the session middleware setting.
    pub cookie_secure: bool,
}

impl HttpState {
    /// Assemble handler state from service instances.
    pub fn new(
        auth: Arc<AuthService>,
        lists: Arc<ListService>,
        votes: Arc<VoteService>,
        identity: Option<Arc<dyn IdentityProvider>>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            auth,
            lists,
            votes,
            identity,
            cookie_secure,
        }
    }
}

//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::Key;

use crate::outbound::google::GoogleConfig;

/// Builder-style configuration for creating the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) bind_addr: SocketAddr,
    /// Absolute base URL used when assembling links sent to users.
    pub(crate) base_url: String,
    pub(crate) google: Option<GoogleConfig>,
}

impl ServerConfig {
    /// Construct a server configuration.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, bind_addr: SocketAddr, base_url: String) -> Self {
        Self {
            key,
            cookie_secure,
            bind_addr,
            base_url,
            google: None,
        }
    }

    /// Attach Google OAuth configuration. Without it the federated login
    /// endpoints answer with a configuration error.
    #[must_use]
    pub fn with_google(mut self, google: Option<GoogleConfig>) -> Self {
        self.google = google;
        self
    }

    /// The socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

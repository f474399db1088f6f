//! Backend library for the top-ten list voting application.
//!
//! The crate follows a hexagonal layout: `domain` holds entities, ports, and
//! the rule-bearing services; `inbound` adapts HTTP requests onto those
//! services; `outbound` implements the driven ports (PostgreSQL persistence,
//! the Google identity provider, mail delivery).

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::trace::Trace;

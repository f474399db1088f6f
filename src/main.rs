//! Backend entry-point: wires REST endpoints, persistence, and OpenAPI docs.

use std::env;
use std::net::SocketAddr;

use actix_web::cookie::Key;
use actix_web::{App, HttpServer, web};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use topten::ApiDoc;
use topten::Trace;
use topten::domain::ports::CategoryRepository;
use topten::inbound::http;
use topten::outbound::google::GoogleConfig;
use topten::outbound::persistence::{
    DieselCategoryRepository, PoolConfig, build_pool, run_migrations,
};
use topten::server::{ServerConfig, build_state};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    let key = match std::fs::read(&key_path) {
        Ok(bytes) => Key::derive_from(&bytes),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Key::generate()
            } else {
                return Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )));
            }
        }
    };

    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);

    let bind_addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;

    let base_url =
        env::var("APP_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", bind_addr.port()));

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| std::io::Error::other("DATABASE_URL must be set"))?;

    run_migrations(&database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("migrations failed: {e}")))?;

    let pool = build_pool(&PoolConfig::new(&database_url))
        .await
        .map_err(|e| std::io::Error::other(format!("pool construction failed: {e}")))?;

    // Category reference data is installed once and treated as read-only
    // from then on.
    DieselCategoryRepository::new(pool.clone())
        .seed_catalogue()
        .await
        .map_err(|e| std::io::Error::other(format!("category seeding failed: {e}")))?;

    let google = GoogleConfig::from_env();
    if google.is_none() {
        warn!("Google OAuth not configured; federated login disabled");
    }

    let config = ServerConfig::new(key, cookie_secure, bind_addr, base_url).with_google(google);
    let state = build_state(pool, &config);

    let server = HttpServer::new(move || {
        let session = config.session_middleware();
        let api = web::scope("/api").wrap(session).configure(http::configure);

        let app = App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Trace)
            .service(api);

        #[cfg(debug_assertions)]
        let app =
            app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));

        app
    })
    .bind(bind_addr)?;

    server.run().await
}

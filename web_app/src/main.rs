//! # Plakita Web Application
//!
//! Main entry point of the pet tag web application. Picks the store
//! backend, configures TLS, cookies and cryptographic keys, and mounts the
//! routes.

#![recursion_limit = "256"]

pub mod api;
pub mod config;
pub mod consts;
pub mod front;
pub mod logger;
pub mod metric;
pub mod models;
pub mod repo;
pub mod services;
pub mod utils;

use anyhow::Context;
use csrf::AesGcmCsrfProtection;
use logfire::config::MetricsOptions;
use ntex::web;
use ntex_cors::Cors;
use ntex_identity::{CookieIdentityPolicy, IdentityService};
use ntex_session::CookieSession;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

/// Store and auth implementations of the configured backend. Each worker
/// gets its own boxed copy.
#[derive(Clone)]
enum Backend {
    Sqlite(repo::sqlite::SqlxSqliteRepo, services::local_auth::LocalAuth),
    Supabase(
        repo::postgrest::PostgrestRepo,
        services::supabase_auth::SupabaseAuth,
    ),
}

impl Backend {
    async fn from_config(app_config: &config::AppConfig) -> anyhow::Result<Self> {
        match app_config.store_backend {
            config::StoreBackend::Sqlite => {
                let db_pool = utils::setup_sqlite_db_pool(app_config).await?;

                Ok(Backend::Sqlite(
                    repo::sqlite::SqlxSqliteRepo {
                        db_pool: db_pool.clone(),
                    },
                    services::local_auth::LocalAuth { db_pool },
                ))
            }
            config::StoreBackend::Supabase => Ok(Backend::Supabase(
                repo::postgrest::PostgrestRepo::new(
                    &app_config.supabase_url,
                    &app_config.supabase_service_key,
                ),
                services::supabase_auth::SupabaseAuth::new(
                    &app_config.supabase_url,
                    &app_config.supabase_anon_key,
                ),
            )),
        }
    }

    fn boxed(&self) -> (repo::ImplAppRepo, services::ImplAuthService) {
        match self.clone() {
            Backend::Sqlite(repo, auth) => (Box::new(repo), Box::new(auth)),
            Backend::Supabase(repo, auth) => (Box::new(repo), Box::new(auth)),
        }
    }
}

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::init_config()?;

    // logfire when a token is configured, stdout logs otherwise
    let shutdown_handler = match app_config.logfire_token.is_empty() {
        true => {
            logger::setup_simple_logger()?;
            None
        }
        false => Some(
            logfire::configure()
                .install_panic_handler()
                .with_metrics(Some(MetricsOptions::default()))
                .send_to_logfire(logfire::config::SendToLogfire::Yes)
                .with_token(&app_config.logfire_token)
                .finish()?,
        ),
    };

    let backend = Backend::from_config(app_config).await?;
    log::info!("store backend: {}", app_config.store_backend);

    let session_events = services::SessionEvents::default();
    ntex::rt::spawn(services::listen_session_events(session_events.subscribe()));

    // Csrf key derived from the configured password and salt, cookie keys
    // are random so sessions end on restart
    let csrf_key = utils::build_csrf_key(&app_config.csrf_pass, &app_config.csrf_salt)?;
    let session_key = utils::build_random_csrf_key()?;
    let identity_key = utils::build_random_csrf_key()?;

    configure_and_run_server(csrf_key, session_key, identity_key, backend, session_events)
        .await?;

    if let Some(shutdown_handler) = shutdown_handler {
        shutdown_handler.shutdown()?;
    }

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .context("failed to create SSL acceptor")?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .with_context(|| {
            format!(
                "failed to load private key from {}",
                app_config.private_key_path
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .with_context(|| {
            format!(
                "failed to load certificate from {}",
                app_config.certificate_path
            )
        })?;

    Ok(ssl_acceptor)
}

/// Creates the per worker application state
fn create_app_state(
    csrf_key: [u8; 32],
    backend: &Backend,
    session_events: services::SessionEvents,
    base_url: String,
) -> front::AppState {
    let (repo, auth_service) = backend.boxed();

    front::AppState {
        csrf_protec: AesGcmCsrfProtection::from_key(csrf_key),
        repo,
        auth_service,
        session_events,
        base_url,
    }
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    csrf_key: [u8; 32],
    session_key: [u8; 32],
    identity_key: [u8; 32],
    backend: Backend,
    session_events: services::SessionEvents,
) -> anyhow::Result<()> {
    let app_config = config::APP_CONFIG
        .get()
        .context("failed to get app config")?;
    let server_addr = ("0.0.0.0", app_config.wep_server_port);
    let base_url = app_config.base_url();

    let server = web::server(move || {
        web::App::new()
            .wrap(
                Cors::new()
                    .allowed_methods(vec!["GET", "HEAD", "POST", "OPTIONS"])
                    .allowed_origin(&base_url)
                    .finish(),
            )
            .wrap(
                CookieSession::private(&session_key)
                    .secure(app_config.is_prod())
                    .domain(app_config.wep_server_host.to_string())
                    .max_age(consts::MAX_AGE_COOKIES)
                    .name("plakita-session"),
            )
            .wrap(IdentityService::new(
                CookieIdentityPolicy::new(&identity_key)
                    .name("plakita-user")
                    .domain(app_config.wep_server_host.to_string())
                    .max_age(consts::MAX_AGE_COOKIES)
                    .secure(app_config.is_prod()),
            ))
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(create_app_state(
                csrf_key,
                &backend,
                session_events.clone(),
                base_url.clone(),
            ))
            .configure(front::routes::site)
            .configure(front::routes::activation)
            .configure(front::routes::pet_public_profile)
            .configure(front::routes::dashboard)
            .configure(front::routes::admin)
            .configure(front::routes::json_api)
            .service(ntex_files::Files::new("/static", "web/static/"))
            .default_service(web::route().to(front::server::serve_not_found))
    });

    let bound_server = if app_config.is_prod() {
        server.bind_openssl(server_addr, setup_ssl_acceptor(app_config)?)?
    } else {
        server.bind(server_addr)?
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

//! Application configuration management with security considerations.
//!
//! All values come from environment variables. Sensitive fields are marked
//! and must never be logged.

use derive_more::Display;
use envconfig::Envconfig;
use std::{str::FromStr, sync::OnceLock};

/// Backend holding the tables, procedures and auth
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Self-hosted sqlite file (sqlcipher encrypted on prod)
    #[display("sqlite")]
    Sqlite,
    /// Hosted PostgREST + GoTrue (Supabase)
    #[display("supabase")]
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "supabase" => Ok(StoreBackend::Supabase),
            other => anyhow::bail!("unknown store backend: {other}"),
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Which backend serves the data (NON-SENSITIVE)
    #[envconfig(default = "sqlite")]
    pub store_backend: StoreBackend,

    /// Database host value (NON-SENSITIVE)
    /// Example: "sqlite:data/plakita.db"
    #[envconfig(default = "sqlite:data/plakita.db")]
    pub db_host: String,

    /// 🔒 SENSITIVE: Database password to encrypt SQLite data
    #[envconfig(default = "")]
    pub db_pass_encrypt: String,

    /// Hosted backend url (NON-SENSITIVE)
    /// Example: "https://xyzcompany.supabase.co"
    #[envconfig(default = "")]
    pub supabase_url: String,

    /// Hosted backend public key, required by the auth endpoints (SEMI-SENSITIVE)
    #[envconfig(default = "")]
    pub supabase_anon_key: String,

    /// 🔒 SENSITIVE: Hosted backend service key
    #[envconfig(default = "")]
    pub supabase_service_key: String,

    /// Host address for web server binding (NON-SENSITIVE)
    /// Example: "0.0.0.0", "localhost", "plakita.app"
    #[envconfig(default = "localhost")]
    pub wep_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(default = "8080")]
    pub wep_server_port: u16,

    /// Path to SSL private key file (SENSITIVE PATH)
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// 🔒 SENSITIVE: CSRF protection password (UUID format)
    pub csrf_pass: String,

    /// 🔒 SENSITIVE: CSRF protection salt (UUID format)
    pub csrf_salt: String,

    /// 🔒 SENSITIVE: logfire write token. Empty keeps logs on stdout only
    #[envconfig(default = "")]
    pub logfire_token: String,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Gets the server URL host with port for non-production environments
    pub fn url_host(&self) -> String {
        if self.is_prod() {
            return self.wep_server_host.to_string();
        }

        format!(
            "{host}:{port}",
            host = self.wep_server_host,
            port = self.wep_server_port
        )
    }

    /// Gets the appropriate protocol (HTTP/HTTPS) based on environment
    pub fn wep_server_protocol(&self) -> String {
        if self.is_prod() {
            return "https".into();
        }
        "http".into()
    }

    /// Constructs the complete base URL for the application
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.wep_server_protocol(), self.url_host())
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.store_backend == StoreBackend::Supabase
            && (self.supabase_url.is_empty()
                || self.supabase_anon_key.is_empty()
                || self.supabase_service_key.is_empty())
        {
            anyhow::bail!(
                "STORE_BACKEND=supabase requires SUPABASE_URL, SUPABASE_ANON_KEY and SUPABASE_SERVICE_KEY"
            );
        }

        if self.is_prod() && self.store_backend == StoreBackend::Sqlite && self.db_pass_encrypt.is_empty()
        {
            anyhow::bail!("DB_PASS_ENCRYPT is required on prod");
        }

        Ok(())
    }
}

/// Global application configuration, set once by [init_config]
pub static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Loads and validates the configuration from the environment
pub fn init_config() -> anyhow::Result<&'static AppConfig> {
    let app_config = AppConfig::init_from_env()?;
    app_config.check()?;

    Ok(APP_CONFIG.get_or_init(|| app_config))
}

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct AppConfig {
    #[envconfig(from = "ENV", default = "local")]
    pub env: String,
    #[envconfig(from = "DB_HOST", default = "sqlite:data/plakita.db")]
    pub db_host: String,
    #[envconfig(from = "DB_PASS_ENCRYPT", default = "")]
    pub db_pass_encrypt: String,
}

impl AppConfig {
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }
}

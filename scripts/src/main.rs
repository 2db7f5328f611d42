pub mod action;
pub mod config;
pub mod utils;

use clap::Parser;
use envconfig::Envconfig;
use log::LevelFilter;
use simplelog::{ConfigBuilder, SimpleLogger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new().set_time_format_rfc3339().build(),
    )?;

    let app_config = config::AppConfig::init_from_env()?;
    let args = action::AppArgs::parse();

    args.run(&app_config).await
}

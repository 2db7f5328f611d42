use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{config, utils};

#[derive(Args, Debug, Clone)]
pub struct RunMigrationsArgs {
    /// File under migrations/, e.g. 0001_init.sql
    #[arg(short, long)]
    file: String,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateTagsArgs {
    #[arg(short, long, default_value_t = 1)]
    count: u32,
    /// The tags carry a NFC chip
    #[arg(long)]
    nfc: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Role {
    Staff,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::User => "user",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SetRoleArgs {
    #[arg(short, long)]
    email: String,
    #[arg(short, long, value_enum)]
    role: Role,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Action {
    RunMigrations(RunMigrationsArgs),
    /// Creates unclaimed tags with random codes and prints them
    GenerateTags(GenerateTagsArgs),
    /// Grants or revokes the admin pages to a registered user
    SetRole(SetRoleArgs),
}

/// Maintenance tasks of the self-hosted Plakita store
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct AppArgs {
    #[command(subcommand)]
    pub action: Action,
}

impl AppArgs {
    pub async fn run(&self, app_config: &config::AppConfig) -> anyhow::Result<()> {
        let db_pool = utils::setup_sqlite_db_pool(app_config).await?;

        match &self.action {
            Action::RunMigrations(RunMigrationsArgs { file }) => {
                utils::run_migrations(&db_pool, file).await?;
                log::info!("migration {file} applied");
            }
            Action::GenerateTags(GenerateTagsArgs { count, nfc }) => {
                let mut created = 0;
                while created < *count {
                    let code = utils::generate_tag_code();
                    if !utils::insert_tag(&db_pool, &code, *nfc).await? {
                        log::warn!("code {code} already exists, generating a new one");
                        continue;
                    }

                    println!("{code}");
                    created += 1;
                }
                log::info!("{created} tags created");
            }
            Action::SetRole(SetRoleArgs { email, role }) => {
                if !utils::set_user_role(&db_pool, email, role.as_str()).await? {
                    anyhow::bail!("no user registered with {email}, sign in once first");
                }
                log::info!("{email} is now {}", role.as_str());
            }
        }

        Ok(())
    }
}

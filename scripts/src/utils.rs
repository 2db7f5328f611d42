use crate::config;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};
use std::str::FromStr;
use uuid::Uuid;

/// Shape of generated tag codes, equal to `TAG_CODE_PREFIX` and
/// `TAG_CODE_RANDOM_LEN` of the web app
pub const TAG_CODE_PREFIX: &str = "PLK";
pub const TAG_CODE_RANDOM_LEN: usize = 6;

pub async fn run_migrations(db_pool: &SqlitePool, file_name: &str) -> anyhow::Result<()> {
    let tera = tera::Tera::new("../migrations/**/*.sql")?;

    let migration = tera.render(file_name, &tera::Context::new())?;

    sqlx::raw_sql(&migration).execute(db_pool).await?;
    Ok(())
}

pub async fn setup_sqlite_db_pool(app_config: &config::AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&app_config.db_host)?.create_if_missing(true);

    if app_config.is_prod() {
        return Ok(SqlitePool::connect_with(
            options
                .pragma("key", app_config.db_pass_encrypt.clone())
                .pragma("cipher_page_size", "1024")
                .pragma("kdf_iter", "64000")
                .pragma("cipher_hmac_algorithm", "HMAC_SHA1")
                .pragma("cipher_kdf_algorithm", "PBKDF2_HMAC_SHA1")
                .journal_mode(SqliteJournalMode::Delete),
        )
        .await?);
    }

    Ok(SqlitePool::connect_with(options).await?)
}

/// Random code like `PLK-3F9A1C`
pub fn generate_tag_code() -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();

    format!("{TAG_CODE_PREFIX}-{}", &random[..TAG_CODE_RANDOM_LEN])
}

/// Inserts an unclaimed tag. `Ok(false)` means the code already exists.
pub async fn insert_tag(db_pool: &SqlitePool, code: &str, has_nfc: bool) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO tags(id,code,activated,has_nfc,created_at) VALUES($1,$2,0,$3,$4);",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(code)
    .bind(has_nfc)
    .bind(chrono::Utc::now())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Sets the role of the user registered with `email`. `Ok(false)` if there is none.
pub async fn set_user_role(db_pool: &SqlitePool, email: &str, role: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE users SET account_role = $1, updated_at = $2 WHERE email = $3;")
        .bind(role)
        .bind(chrono::Utc::now())
        .bind(email.trim().to_lowercase())
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::raw_sql(include_str!("../../migrations/0001_init.sql"))
            .execute(&db_pool)
            .await
            .unwrap();

        db_pool
    }

    #[test]
    fn test_generated_code_shape() {
        let code = generate_tag_code();

        assert_eq!(code.len(), TAG_CODE_PREFIX.len() + 1 + TAG_CODE_RANDOM_LEN);
        assert!(code.starts_with("PLK-"));
        assert!(code[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_skipped() {
        let db_pool = memory_pool().await;

        assert!(insert_tag(&db_pool, "PLK-ABC123", true).await.unwrap());
        assert!(!insert_tag(&db_pool, "PLK-ABC123", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_role_of_unknown_user() {
        let db_pool = memory_pool().await;

        assert!(!set_user_role(&db_pool, "nobody@plakita.app", "staff").await.unwrap());
    }
}

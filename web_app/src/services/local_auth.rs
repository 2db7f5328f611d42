use crate::{
    models,
    repo::{sqlite::map_sqlx_err, sqlite_queries},
};
use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::{AuthError, AuthService};

/// Auth kept next to the self-hosted tables, passwords stored as argon2 PHC strings
#[derive(Clone)]
pub struct LocalAuth {
    pub db_pool: SqlitePool,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow!("salt couldn't be created: {e}"))?;

    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password couldn't be hashed: {e}"))?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

struct StoredAuthUser {
    user: models::user_app::AuthUser,
    password_hash: String,
}

fn stored_user_from_row(row: &SqliteRow) -> anyhow::Result<StoredAuthUser> {
    let id: uuid::fmt::Hyphenated = row.try_get("id")?;
    let metadata: String = row.try_get("user_metadata")?;

    Ok(StoredAuthUser {
        user: models::user_app::AuthUser {
            id: id.into(),
            email: row.try_get("email")?,
            user_metadata: serde_json::from_str(&metadata)?,
        },
        password_hash: row.try_get("password_hash")?,
    })
}

impl LocalAuth {
    async fn open_session(
        &self,
        user: models::user_app::AuthUser,
    ) -> anyhow::Result<models::user_app::AuthSession> {
        let access_token = Uuid::new_v4().simple().to_string();

        sqlx::query(sqlite_queries::INSERT_AUTH_SESSION)
            .bind(&access_token)
            .bind(user.id.to_string())
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(models::user_app::AuthSession { access_token, user })
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn get_session(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<models::user_app::AuthUser>> {
        let row = sqlx::query(sqlite_queries::GET_AUTH_USER_BY_SESSION)
            .bind(access_token)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        row.map(|r| stored_user_from_row(&r).map(|stored| stored.user))
            .transpose()
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<models::user_app::AuthSession> {
        let row = sqlx::query(sqlite_queries::GET_AUTH_USER_BY_EMAIL)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or(AuthError::InvalidCredentials)?;

        let stored = stored_user_from_row(&row)?;
        if !verify_password(password, &stored.password_hash) {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.open_session(stored.user).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &models::user_app::SignUpProfile,
    ) -> anyhow::Result<Option<models::user_app::AuthSession>> {
        let user = models::user_app::AuthUser {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            user_metadata: serde_json::to_value(profile)?,
        };

        let inserted = sqlx::query(sqlite_queries::INSERT_AUTH_USER)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(hash_password(password)?)
            .bind(user.user_metadata.to_string())
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await;

        match inserted {
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(AuthError::EmailTaken.into());
            }
            Err(e) => return Err(map_sqlx_err(e)),
            Ok(_) => {}
        }

        Ok(Some(self.open_session(user).await?))
    }

    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::DELETE_AUTH_SESSION)
            .bind(access_token)
            .execute(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::sqlite::tests::memory_repo;

    async fn local_auth() -> LocalAuth {
        LocalAuth {
            db_pool: memory_repo().await.db_pool,
        }
    }

    fn profile() -> models::user_app::SignUpProfile {
        models::user_app::SignUpProfile {
            full_name: "Ana Pérez".into(),
            phone: "5512345678".into(),
        }
    }

    #[test]
    fn test_password_hash_verification() {
        let hash = hash_password("secret1").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in_and_out() {
        let auth = local_auth().await;

        let signed_up = auth
            .sign_up("Ana@Plakita.app", "secret1", &profile())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signed_up.user.email, "ana@plakita.app");
        assert_eq!(
            signed_up.user.metadata_str("full_name").as_deref(),
            Some("Ana Pérez")
        );

        let session = auth.sign_in("ana@plakita.app", "secret1").await.unwrap();
        assert_eq!(session.user.id, signed_up.user.id);

        let resolved = auth.get_session(&session.access_token).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(signed_up.user.id));

        auth.sign_out(&session.access_token).await.unwrap();
        assert!(auth.get_session(&session.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_duplicate_email() {
        let auth = local_auth().await;
        auth.sign_up("ana@plakita.app", "secret1", &profile())
            .await
            .unwrap();

        let err = auth.sign_in("ana@plakita.app", "nope").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::InvalidCredentials)
        );

        let err = auth.sign_in("ghost@plakita.app", "secret1").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::InvalidCredentials)
        );

        let err = auth
            .sign_up("ana@plakita.app", "other12", &profile())
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::EmailTaken));
    }
}

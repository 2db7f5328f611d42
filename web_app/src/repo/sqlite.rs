use crate::models;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, Row, SqlitePool, sqlite::SqliteRow};
use std::collections::HashMap;
use uuid::Uuid;

use super::{AppRepo, StoreError, sqlite_queries};

#[derive(Clone)]
pub struct SqlxSqliteRepo {
    pub db_pool: SqlitePool,
}

/// Maps sqlx failures into the [StoreError] variants the api layer understands
pub fn map_sqlx_err(err: sqlx::Error) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string()).into()
        }
        _ => StoreError::Transport(err.to_string()).into(),
    }
}

/// Escapes the LIKE wildcards so user input only matches literally
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn get_uuid(row: &SqliteRow, column: &str) -> sqlx::Result<Uuid> {
    let value: uuid::fmt::Hyphenated = row.try_get(column)?;
    Ok(value.into())
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> sqlx::Result<Option<Uuid>> {
    let value: Option<uuid::fmt::Hyphenated> = row.try_get(column)?;
    Ok(value.map(Into::into))
}

fn pet_from_row(row: &SqliteRow, prefix: &str) -> sqlx::Result<models::pet::Pet> {
    let col = |name: &str| format!("{prefix}{name}");
    let pet_type: String = row.try_get(col("type").as_str())?;

    Ok(models::pet::Pet {
        id: get_uuid(row, &col("id"))?,
        name: row.try_get(col("name").as_str())?,
        pet_type: pet_type
            .parse()
            .map_err(|e: anyhow::Error| sqlx::Error::Decode(e.into()))?,
        breed: row.try_get(col("breed").as_str())?,
        owner_name: row.try_get(col("owner_name").as_str())?,
        owner_contact: row.try_get(col("owner_contact").as_str())?,
        owner_phone: row.try_get(col("owner_phone").as_str())?,
        notes: row.try_get(col("notes").as_str())?,
        qr_activated: row.try_get(col("qr_activated").as_str())?,
        user_id: get_uuid(row, &col("user_id"))?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

impl FromRow<'_, SqliteRow> for models::tag::Tag {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: get_uuid(row, "id")?,
            code: row.try_get("code")?,
            activated: row.try_get("activated")?,
            activated_at: row.try_get("activated_at")?,
            pet_id: get_opt_uuid(row, "pet_id")?,
            user_id: get_opt_uuid(row, "user_id")?,
            has_nfc: row.try_get("has_nfc")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for models::tag::TagRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let pet = match get_opt_uuid(row, "p_id")? {
            Some(_) => Some(pet_from_row(row, "p_")?),
            None => None,
        };

        Ok(Self {
            tag: models::tag::Tag::from_row(row)?,
            pet,
        })
    }
}

impl FromRow<'_, SqliteRow> for models::pet::Pet {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        pet_from_row(row, "")
    }
}

impl FromRow<'_, SqliteRow> for models::user_app::User {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let account_role: String = row.try_get("account_role")?;

        Ok(Self {
            id: get_uuid(row, "id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            account_role: account_role.parse().unwrap_or_default(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Activated tag joined with what its references resolve to
struct IntegrityCandidate {
    tag_id: Uuid,
    code: String,
    pet_id: Option<Uuid>,
    user_id: Option<Uuid>,
    pet_owner: Option<Uuid>,
    user_exists: bool,
    pet_owner_exists: bool,
}

impl FromRow<'_, SqliteRow> for IntegrityCandidate {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            tag_id: get_uuid(row, "id")?,
            code: row.try_get("code")?,
            pet_id: get_opt_uuid(row, "pet_id")?,
            user_id: get_opt_uuid(row, "user_id")?,
            pet_owner: get_opt_uuid(row, "pet_owner")?,
            user_exists: row.try_get("user_exists")?,
            pet_owner_exists: row.try_get("pet_owner_exists")?,
        })
    }
}

impl IntegrityCandidate {
    fn issue(&self) -> Option<models::admin::IntegrityIssue> {
        models::admin::IntegrityIssueKind::classify(self.user_id, self.pet_owner, self.user_exists)
            .map(|kind| models::admin::IntegrityIssue {
                tag_id: self.tag_id,
                code: self.code.to_string(),
                kind,
                pet_id: self.pet_id,
                user_id: self.user_id,
            })
    }
}

impl SqlxSqliteRepo {
    async fn get_integrity_candidates(&self) -> anyhow::Result<Vec<IntegrityCandidate>> {
        sqlx::query_as::<_, IntegrityCandidate>(sqlite_queries::QUERY_INTEGRITY_CANDIDATES)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn repair_candidate(
        &self,
        candidate: &IntegrityCandidate,
        kind: models::admin::IntegrityIssueKind,
    ) -> models::admin::IntegrityFixOutcome {
        use models::admin::IntegrityIssueKind;

        let mut outcome = models::admin::IntegrityFixOutcome {
            tag_id: candidate.tag_id,
            code: candidate.code.to_string(),
            success: false,
            action: String::new(),
            error: None,
        };

        let result = match (kind, candidate.pet_owner) {
            (IntegrityIssueKind::OrphanedActivation, _) => {
                outcome.action = "deactivated".into();
                sqlx::query(sqlite_queries::QUERY_DEACTIVATE_ORPHANED_TAG)
                    .bind(candidate.tag_id.to_string())
                    .execute(&self.db_pool)
                    .await
                    .map(|r| r.rows_affected() > 0)
            }
            (_, Some(pet_owner)) if candidate.pet_owner_exists => {
                outcome.action = "owner_adopted_from_pet".into();
                sqlx::query(sqlite_queries::QUERY_SET_TAG_OWNER)
                    .bind(candidate.tag_id.to_string())
                    .bind(pet_owner.to_string())
                    .execute(&self.db_pool)
                    .await
                    .map(|r| r.rows_affected() > 0)
            }
            _ => {
                outcome.action = "manual_review".into();
                outcome.error = Some("the pet owner cannot be resolved".into());
                return outcome;
            }
        };

        match result {
            Ok(true) => outcome.success = true,
            Ok(false) => outcome.error = Some("tag changed while repairing".into()),
            Err(e) => outcome.error = Some(e.to_string()),
        }

        outcome
    }
}

#[async_trait]
impl AppRepo for SqlxSqliteRepo {
    async fn find_tags_by_code(&self, code: &str) -> anyhow::Result<Vec<models::tag::TagRecord>> {
        sqlx::query_as::<_, models::tag::TagRecord>(&sqlite_queries::query_get_tags_by_code())
            .bind(code)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn find_tags_by_code_ilike(
        &self,
        code: &str,
    ) -> anyhow::Result<Vec<models::tag::TagRecord>> {
        sqlx::query_as::<_, models::tag::TagRecord>(&sqlite_queries::query_get_tags_by_code_like())
            .bind(escape_like(code))
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn search_tag_codes(&self, fragment: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar(sqlite_queries::QUERY_SEARCH_TAG_CODES)
            .bind(escape_like(fragment))
            .bind(limit as i64)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn has_any_tag(&self) -> anyhow::Result<bool> {
        sqlx::query_scalar(sqlite_queries::QUERY_HAS_ANY_TAG)
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn get_tag_by_id(&self, tag_id: Uuid) -> anyhow::Result<Option<models::tag::Tag>> {
        sqlx::query_as::<_, models::tag::Tag>(sqlite_queries::QUERY_GET_TAG_BY_ID)
            .bind(tag_id.to_string())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn get_all_tags(&self) -> anyhow::Result<Vec<models::tag::Tag>> {
        sqlx::query_as::<_, models::tag::Tag>(sqlite_queries::QUERY_GET_ALL_TAGS)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn insert_tag(&self, tag: &models::tag::Tag) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::QUERY_INSERT_TAG)
            .bind(tag.id.to_string())
            .bind(&tag.code)
            .bind(tag.activated)
            .bind(tag.activated_at)
            .bind(tag.pet_id.map(|id| id.to_string()))
            .bind(tag.user_id.map(|id| id.to_string()))
            .bind(tag.has_nfc)
            .bind(tag.created_at)
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_err)
    }

    async fn delete_unclaimed_tag(&self, tag_id: Uuid) -> anyhow::Result<bool> {
        sqlx::query(sqlite_queries::QUERY_DELETE_UNCLAIMED_TAG)
            .bind(tag_id.to_string())
            .execute(&self.db_pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(map_sqlx_err)
    }

    async fn link_tag_to_pet(
        &self,
        tag_id: Uuid,
        pet_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        sqlx::query(sqlite_queries::QUERY_LINK_TAG_TO_PET)
            .bind(tag_id.to_string())
            .bind(pet_id.to_string())
            .bind(user_id.to_string())
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(map_sqlx_err)
    }

    async fn unlink_pet_tags(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::QUERY_UNLINK_PET_TAGS)
            .bind(pet_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_err)
    }

    async fn get_pet_by_id(&self, pet_id: Uuid) -> anyhow::Result<Option<models::pet::Pet>> {
        sqlx::query_as::<_, models::pet::Pet>(sqlite_queries::QUERY_GET_PET_BY_ID)
            .bind(pet_id.to_string())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn insert_pet(&self, pet: &models::pet::Pet) -> anyhow::Result<Uuid> {
        sqlx::query(sqlite_queries::QUERY_INSERT_PET)
            .bind(pet.id.to_string())
            .bind(&pet.name)
            .bind(pet.pet_type.to_string())
            .bind(&pet.breed)
            .bind(&pet.owner_name)
            .bind(&pet.owner_contact)
            .bind(&pet.owner_phone)
            .bind(&pet.notes)
            .bind(pet.qr_activated)
            .bind(pet.user_id.to_string())
            .bind(pet.created_at)
            .bind(pet.updated_at)
            .execute(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(pet.id)
    }

    async fn update_pet(&self, pet: &models::pet::Pet, user_id: Uuid) -> anyhow::Result<bool> {
        sqlx::query(sqlite_queries::QUERY_UPDATE_PET)
            .bind(pet.id.to_string())
            .bind(user_id.to_string())
            .bind(&pet.name)
            .bind(pet.pet_type.to_string())
            .bind(&pet.breed)
            .bind(&pet.owner_name)
            .bind(&pet.owner_contact)
            .bind(&pet.owner_phone)
            .bind(&pet.notes)
            .bind(pet.qr_activated)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(map_sqlx_err)
    }

    async fn delete_pet(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::QUERY_DELETE_PET)
            .bind(pet_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_err)
    }

    async fn get_user_pets(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<models::pet::PetWithTags>> {
        let pets = sqlx::query_as::<_, models::pet::Pet>(sqlite_queries::QUERY_GET_PETS_BY_USER)
            .bind(user_id.to_string())
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        let mut tags_by_pet: HashMap<Uuid, Vec<models::tag::Tag>> = HashMap::new();
        for tag in sqlx::query_as::<_, models::tag::Tag>(sqlite_queries::QUERY_GET_TAGS_BY_USER)
            .bind(user_id.to_string())
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?
        {
            if let Some(pet_id) = tag.pet_id {
                tags_by_pet.entry(pet_id).or_default().push(tag);
            }
        }

        Ok(pets
            .into_iter()
            .map(|pet| models::pet::PetWithTags {
                tags: tags_by_pet.remove(&pet.id).unwrap_or_default(),
                pet,
            })
            .collect())
    }

    async fn get_user_by_id(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<models::user_app::User>> {
        sqlx::query_as::<_, models::user_app::User>(sqlite_queries::QUERY_GET_USER_BY_ID)
            .bind(user_id.to_string())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn upsert_user(&self, user: &models::user_app::User) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::QUERY_UPSERT_USER)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.phone)
            .bind(user.account_role.to_string())
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_err)
    }

    async fn get_admin_stats(&self) -> anyhow::Result<models::admin::AdminStats> {
        let row = sqlx::query(sqlite_queries::QUERY_ADMIN_STATS)
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(models::admin::AdminStats {
            total_tags: row.try_get("total_tags")?,
            activated_tags: row.try_get("activated_tags")?,
            unclaimed_tags: row.try_get("unclaimed_tags")?,
            claimed_not_completed_tags: row.try_get("claimed_not_completed_tags")?,
            total_pets: row.try_get("total_pets")?,
            total_users: row.try_get("total_users")?,
        })
    }

    async fn list_users(&self) -> anyhow::Result<Vec<models::user_app::User>> {
        sqlx::query_as::<_, models::user_app::User>(sqlite_queries::QUERY_LIST_USERS)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn verify_user_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<models::admin::UserVerification>> {
        let Some(user) =
            sqlx::query_as::<_, models::user_app::User>(sqlite_queries::QUERY_GET_USER_BY_EMAIL)
                .bind(email)
                .fetch_optional(&self.db_pool)
                .await
                .map_err(map_sqlx_err)?
        else {
            return Ok(None);
        };

        let counts = sqlx::query(sqlite_queries::QUERY_USER_COUNTS)
            .bind(user.id.to_string())
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(Some(models::admin::UserVerification {
            pets_count: counts.try_get("pets_count")?,
            tags_count: counts.try_get("tags_count")?,
            user,
        }))
    }

    async fn search_user_emails(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar(sqlite_queries::QUERY_SEARCH_USER_EMAILS)
            .bind(escape_like(fragment))
            .bind(limit as i64)
            .fetch_all(&self.db_pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn get_integrity_report(&self) -> anyhow::Result<Vec<models::admin::IntegrityIssue>> {
        Ok(self
            .get_integrity_candidates()
            .await?
            .iter()
            .filter_map(IntegrityCandidate::issue)
            .collect())
    }

    async fn fix_integrity_issues(
        &self,
    ) -> anyhow::Result<Vec<models::admin::IntegrityFixOutcome>> {
        let mut outcomes = vec![];

        for candidate in self.get_integrity_candidates().await? {
            if let Some(issue) = candidate.issue() {
                outcomes.push(self.repair_candidate(&candidate, issue.kind).await);
            }
        }

        Ok(outcomes)
    }

    async fn mark_tag_nfc(&self, code: &str, has_nfc: bool) -> anyhow::Result<bool> {
        sqlx::query(sqlite_queries::QUERY_MARK_TAG_NFC)
            .bind(code)
            .bind(has_nfc)
            .execute(&self.db_pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(map_sqlx_err)
    }

    async fn get_nfc_stats(&self) -> anyhow::Result<models::admin::NfcStats> {
        let row = sqlx::query(sqlite_queries::QUERY_NFC_STATS)
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(models::admin::NfcStats {
            nfc_tags: row.try_get("nfc_tags")?,
            activated_nfc_tags: row.try_get("activated_nfc_tags")?,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::models::{pet::PetType, tag::Tag, user_app::User};
    use sqlx::sqlite::SqlitePoolOptions;

    pub async fn memory_repo() -> SqlxSqliteRepo {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::raw_sql(sqlite_queries::SCHEMA)
            .execute(&db_pool)
            .await
            .unwrap();

        SqlxSqliteRepo { db_pool }
    }

    pub fn test_user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: "Jo Doe".into(),
            phone: Some("+52 55 1234 5678".into()),
            account_role: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn test_pet(user_id: Uuid) -> models::pet::Pet {
        models::pet::Pet {
            id: Uuid::new_v4(),
            name: "Rex".into(),
            pet_type: PetType::Dog,
            breed: "Mixed".into(),
            owner_name: "Jo Doe".into(),
            owner_contact: "jo@example.com".into(),
            owner_phone: String::new(),
            notes: String::new(),
            qr_activated: true,
            user_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_tags_by_code_exact_and_like() {
        let repo = memory_repo().await;
        repo.insert_tag(&Tag::new_unclaimed("PLK-ABC123", false))
            .await
            .unwrap();

        assert_eq!(repo.find_tags_by_code("PLK-ABC123").await.unwrap().len(), 1);
        assert!(repo.find_tags_by_code("plk-abc123").await.unwrap().is_empty());

        let found = repo.find_tags_by_code_ilike("plk-abc123").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].pet.is_none());

        // wildcards in the input are literal
        assert!(repo.find_tags_by_code_ilike("PLK-%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_tag_codes_is_bounded() {
        let repo = memory_repo().await;
        for i in 0..8 {
            repo.insert_tag(&Tag::new_unclaimed(&format!("PLK-00{i}"), false))
                .await
                .unwrap();
        }

        let codes = repo.search_tag_codes("PLK-00", 5).await.unwrap();
        assert_eq!(codes.len(), 5);
        assert!(repo.has_any_tag().await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_duplicate_code_is_conflict() {
        let repo = memory_repo().await;
        repo.insert_tag(&Tag::new_unclaimed("PLK-DUP001", false))
            .await
            .unwrap();

        let err = repo
            .insert_tag(&Tag::new_unclaimed("PLK-DUP001", false))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_link_tag_is_conditional_on_claimant() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        let other = test_user("other@example.com");
        let tag = Tag::new_unclaimed("PLK-LINK01", false);
        repo.insert_tag(&tag).await.unwrap();

        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        assert!(repo.link_tag_to_pet(tag.id, pet_id, owner.id).await.unwrap());
        assert!(!repo.link_tag_to_pet(tag.id, pet_id, other.id).await.unwrap());

        let record = repo.find_tags_by_code("PLK-LINK01").await.unwrap().remove(0);
        assert!(record.tag.activated);
        assert!(record.tag.activated_at.is_some());
        assert_eq!(record.tag.user_id, Some(owner.id));
        assert_eq!(record.pet.map(|p| p.id), Some(pet_id));
    }

    #[tokio::test]
    async fn test_link_keeps_ownerless_activation_with_live_pet() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        let other = test_user("other@example.com");
        let tag = Tag::new_unclaimed("PLK-LINK02", false);
        repo.insert_tag(&tag).await.unwrap();

        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(tag.id, pet_id, owner.id).await.unwrap();
        sqlx::query("UPDATE tags SET user_id = NULL WHERE id = $1")
            .bind(tag.id.to_string())
            .execute(&repo.db_pool)
            .await
            .unwrap();

        let other_pet = repo.insert_pet(&test_pet(other.id)).await.unwrap();
        assert!(!repo.link_tag_to_pet(tag.id, other_pet, other.id).await.unwrap());
        assert_eq!(
            repo.get_tag_by_id(tag.id).await.unwrap().unwrap().pet_id,
            Some(pet_id)
        );

        repo.delete_pet(pet_id, owner.id).await.unwrap();
        assert!(repo.link_tag_to_pet(tag.id, other_pet, other.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_pet_is_scoped_by_owner() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        let mut pet = test_pet(owner.id);
        repo.insert_pet(&pet).await.unwrap();

        pet.name = "Max".into();
        assert!(!repo.update_pet(&pet, Uuid::new_v4()).await.unwrap());
        assert!(repo.update_pet(&pet, owner.id).await.unwrap());
        assert_eq!(
            repo.get_pet_by_id(pet.id).await.unwrap().map(|p| p.name),
            Some("Max".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_unclaimed_tag_refuses_claimed_rows() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        let claimed = Tag::new_unclaimed("PLK-DEL001", false);
        let free = Tag::new_unclaimed("PLK-DEL002", false);
        repo.insert_tag(&claimed).await.unwrap();
        repo.insert_tag(&free).await.unwrap();
        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(claimed.id, pet_id, owner.id)
            .await
            .unwrap();

        assert!(!repo.delete_unclaimed_tag(claimed.id).await.unwrap());
        assert!(repo.delete_unclaimed_tag(free.id).await.unwrap());
        assert!(repo.get_tag_by_id(free.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unlink_and_user_pets() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        repo.upsert_user(&owner).await.unwrap();
        let tag = Tag::new_unclaimed("PLK-UNL001", false);
        repo.insert_tag(&tag).await.unwrap();
        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(tag.id, pet_id, owner.id).await.unwrap();

        let pets = repo.get_user_pets(owner.id).await.unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].tags[0].code, "PLK-UNL001");

        repo.unlink_pet_tags(pet_id, owner.id).await.unwrap();
        repo.delete_pet(pet_id, owner.id).await.unwrap();

        let tag = repo.get_tag_by_id(tag.id).await.unwrap().unwrap();
        assert!(tag.is_deletable());
        assert!(repo.get_user_pets(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphaned_activation_is_reported_and_repaired() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        repo.upsert_user(&owner).await.unwrap();
        let tag = Tag::new_unclaimed("PLK-ORP001", false);
        repo.insert_tag(&tag).await.unwrap();
        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(tag.id, pet_id, owner.id).await.unwrap();

        // pet removed behind the tag's back
        repo.delete_pet(pet_id, owner.id).await.unwrap();

        let report = repo.get_integrity_report().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(
            report[0].kind,
            models::admin::IntegrityIssueKind::OrphanedActivation
        );

        let outcomes = repo.fix_integrity_issues().await.unwrap();
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].action, "deactivated");

        let tag = repo.get_tag_by_id(tag.id).await.unwrap().unwrap();
        assert!(!tag.activated);
        assert!(tag.pet_id.is_none());
        assert!(repo.get_integrity_report().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ownerless_activation_adopts_pet_owner() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        let gone = test_user("gone@example.com");
        repo.upsert_user(&owner).await.unwrap();
        let tag = Tag::new_unclaimed("PLK-OWN001", false);
        repo.insert_tag(&tag).await.unwrap();
        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(tag.id, pet_id, gone.id).await.unwrap();

        let report = repo.get_integrity_report().await.unwrap();
        assert_eq!(
            report[0].kind,
            models::admin::IntegrityIssueKind::OwnerlessActivation
        );

        let outcomes = repo.fix_integrity_issues().await.unwrap();
        assert!(outcomes[0].success);
        assert_eq!(
            repo.get_tag_by_id(tag.id).await.unwrap().unwrap().user_id,
            Some(owner.id)
        );
    }

    #[tokio::test]
    async fn test_stats_and_verification() {
        let repo = memory_repo().await;
        let owner = test_user("owner@example.com");
        repo.upsert_user(&owner).await.unwrap();
        repo.insert_tag(&Tag::new_unclaimed("PLK-STA001", true))
            .await
            .unwrap();
        let tag = Tag::new_unclaimed("PLK-STA002", false);
        repo.insert_tag(&tag).await.unwrap();
        let pet_id = repo.insert_pet(&test_pet(owner.id)).await.unwrap();
        repo.link_tag_to_pet(tag.id, pet_id, owner.id).await.unwrap();
        assert!(repo.mark_tag_nfc("PLK-STA002", true).await.unwrap());
        assert!(!repo.mark_tag_nfc("PLK-NOPE00", true).await.unwrap());

        let stats = repo.get_admin_stats().await.unwrap();
        assert_eq!(stats.total_tags, 2);
        assert_eq!(stats.activated_tags, 1);
        assert_eq!(stats.unclaimed_tags, 1);
        assert_eq!(stats.total_pets, 1);
        assert_eq!(stats.total_users, 1);

        let nfc = repo.get_nfc_stats().await.unwrap();
        assert_eq!(nfc.nfc_tags, 2);
        assert_eq!(nfc.activated_nfc_tags, 1);

        let verification = repo
            .verify_user_by_email("owner@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verification.pets_count, 1);
        assert_eq!(verification.tags_count, 1);
        assert!(repo.verify_user_by_email("x@example.com").await.unwrap().is_none());
        assert_eq!(
            repo.search_user_emails("owner", 5).await.unwrap(),
            vec!["owner@example.com".to_string()]
        );
    }
}

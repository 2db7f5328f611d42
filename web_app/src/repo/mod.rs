pub mod postgrest;
pub mod sqlite;
pub mod sqlite_queries;

use crate::models;
use async_trait::async_trait;
use derive_more::{Display, Error};
use uuid::Uuid;

/// Store failures the api layer distinguishes. Wrapped inside [anyhow::Error]
/// by the repo implementations, anything else is a transport failure.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum StoreError {
    #[display("store rejected the request: insufficient permission")]
    PermissionDenied,
    #[display("store conflict: {_0}")]
    Conflict(#[error(not(source))] String),
    #[display("store request failed: {_0}")]
    Transport(#[error(not(source))] String),
}

/// Contract of the backend store: the `tags`, `pets` and `users` tables plus
/// the named procedures the admin pages rely on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppRepo: Send + Sync {
    /// Exact match on an already normalized code
    async fn find_tags_by_code(&self, code: &str) -> anyhow::Result<Vec<models::tag::TagRecord>>;

    /// Case-insensitive match, no wildcards
    async fn find_tags_by_code_ilike(
        &self,
        code: &str,
    ) -> anyhow::Result<Vec<models::tag::TagRecord>>;

    /// Codes containing `fragment`, at most `limit`
    async fn search_tag_codes(&self, fragment: &str, limit: usize) -> anyhow::Result<Vec<String>>;

    async fn has_any_tag(&self) -> anyhow::Result<bool>;

    async fn get_tag_by_id(&self, tag_id: Uuid) -> anyhow::Result<Option<models::tag::Tag>>;

    async fn get_all_tags(&self) -> anyhow::Result<Vec<models::tag::Tag>>;

    async fn insert_tag(&self, tag: &models::tag::Tag) -> anyhow::Result<()>;

    /// Deletes the tag only while it is unclaimed. Returns false when no row matched.
    async fn delete_unclaimed_tag(&self, tag_id: Uuid) -> anyhow::Result<bool>;

    /// Activates the tag for `user_id` if nobody else claimed it. Returns false
    /// when the conditional update matched no row.
    async fn link_tag_to_pet(&self, tag_id: Uuid, pet_id: Uuid, user_id: Uuid)
    -> anyhow::Result<bool>;

    /// Resets every tag of `pet_id` owned by `user_id` to the unclaimed state
    async fn unlink_pet_tags(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;

    async fn get_pet_by_id(&self, pet_id: Uuid) -> anyhow::Result<Option<models::pet::Pet>>;

    async fn insert_pet(&self, pet: &models::pet::Pet) -> anyhow::Result<Uuid>;

    /// Update scoped by owner. Returns false when no row matched.
    async fn update_pet(&self, pet: &models::pet::Pet, user_id: Uuid) -> anyhow::Result<bool>;

    async fn delete_pet(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;

    async fn get_user_pets(&self, user_id: Uuid)
    -> anyhow::Result<Vec<models::pet::PetWithTags>>;

    async fn get_user_by_id(&self, user_id: Uuid)
    -> anyhow::Result<Option<models::user_app::User>>;

    async fn upsert_user(&self, user: &models::user_app::User) -> anyhow::Result<()>;

    async fn get_admin_stats(&self) -> anyhow::Result<models::admin::AdminStats>;

    async fn list_users(&self) -> anyhow::Result<Vec<models::user_app::User>>;

    async fn verify_user_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<models::admin::UserVerification>>;

    async fn search_user_emails(&self, fragment: &str, limit: usize)
    -> anyhow::Result<Vec<String>>;

    async fn get_integrity_report(&self) -> anyhow::Result<Vec<models::admin::IntegrityIssue>>;

    async fn fix_integrity_issues(&self)
    -> anyhow::Result<Vec<models::admin::IntegrityFixOutcome>>;

    /// Returns false when the code does not exist
    async fn mark_tag_nfc(&self, code: &str, has_nfc: bool) -> anyhow::Result<bool>;

    async fn get_nfc_stats(&self) -> anyhow::Result<models::admin::NfcStats>;
}

pub type ImplAppRepo = Box<dyn AppRepo>;

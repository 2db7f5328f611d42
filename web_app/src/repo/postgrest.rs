//! [AppRepo] over a hosted PostgREST endpoint (Supabase `rest/v1`).
//!
//! Tables are reached with row filters, the admin procedures through
//! `POST /rpc/{name}`. Requests use the service key; ownership is always
//! enforced with explicit `user_id` filters taken from the signed-in session.

use crate::models;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{AppRepo, StoreError};

const TAG_WITH_PET_SELECT: &str = "*,pets(*)";

#[derive(Clone)]
pub struct PostgrestRepo {
    pub client: reqwest::Client,
    pub base_url: String,
    pub service_key: String,
}

/// Error body returned by PostgREST
#[derive(Deserialize, Debug, Default)]
struct PostgrestError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Escapes the pattern characters understood by `ilike`
fn escape_ilike(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('*', "\\*")
}

/// Classifies a failed response into a [StoreError]
pub fn classify_error(status: reqwest::StatusCode, body: &str) -> StoreError {
    let error = serde_json::from_str::<PostgrestError>(body).unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || error.code == "42501"
    {
        return StoreError::PermissionDenied;
    }

    if status == reqwest::StatusCode::CONFLICT || error.code == "23505" {
        return StoreError::Conflict(error.message);
    }

    let message = if error.message.is_empty() {
        format!("{status}: {body}")
    } else {
        format!("{status}: {}", error.message)
    };

    StoreError::Transport(message)
}

impl PostgrestRepo {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: crate::utils::REQUEST_CLIENT.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Err(classify_error(status, &body).into())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()).into())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Vec<T>> {
        self.send_json(
            self.request(reqwest::Method::GET, self.table_url(table))
                .query(query),
        )
        .await
    }

    /// PATCH/DELETE returning the affected rows
    async fn mutate(
        &self,
        method: reqwest::Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut request = self
            .request(method, self.table_url(table))
            .query(query)
            .header("Prefer", "return=representation");

        if let Some(body) = body {
            request = request.json(&body);
        }

        self.send_json(request).await
    }

    async fn rpc<T: DeserializeOwned>(&self, procedure: &str, args: Value) -> anyhow::Result<T> {
        self.send_json(
            self.request(
                reqwest::Method::POST,
                format!("{}/rest/v1/rpc/{procedure}", self.base_url),
            )
            .json(&args),
        )
        .await
    }
}

#[async_trait]
impl AppRepo for PostgrestRepo {
    async fn find_tags_by_code(&self, code: &str) -> anyhow::Result<Vec<models::tag::TagRecord>> {
        self.select(
            "tags",
            &[
                ("select", TAG_WITH_PET_SELECT.into()),
                ("code", format!("eq.{code}")),
            ],
        )
        .await
    }

    async fn find_tags_by_code_ilike(
        &self,
        code: &str,
    ) -> anyhow::Result<Vec<models::tag::TagRecord>> {
        self.select(
            "tags",
            &[
                ("select", TAG_WITH_PET_SELECT.into()),
                ("code", format!("ilike.{}", escape_ilike(code))),
            ],
        )
        .await
    }

    async fn search_tag_codes(&self, fragment: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        #[derive(Deserialize)]
        struct CodeRow {
            code: String,
        }

        let rows: Vec<CodeRow> = self
            .select(
                "tags",
                &[
                    ("select", "code".into()),
                    ("code", format!("ilike.*{}*", escape_ilike(fragment))),
                    ("order", "code.asc".into()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(|r| r.code).collect())
    }

    async fn has_any_tag(&self) -> anyhow::Result<bool> {
        let rows: Vec<Value> = self
            .select("tags", &[("select", "id".into()), ("limit", "1".into())])
            .await?;

        Ok(!rows.is_empty())
    }

    async fn get_tag_by_id(&self, tag_id: Uuid) -> anyhow::Result<Option<models::tag::Tag>> {
        let mut rows: Vec<models::tag::Tag> = self
            .select(
                "tags",
                &[("select", "*".into()), ("id", format!("eq.{tag_id}"))],
            )
            .await?;

        Ok(rows.pop())
    }

    async fn get_all_tags(&self) -> anyhow::Result<Vec<models::tag::Tag>> {
        self.select(
            "tags",
            &[
                ("select", "*".into()),
                ("order", "created_at.desc,code.asc".into()),
            ],
        )
        .await
    }

    async fn insert_tag(&self, tag: &models::tag::Tag) -> anyhow::Result<()> {
        self.send(
            self.request(reqwest::Method::POST, self.table_url("tags"))
                .json(tag),
        )
        .await
        .map(|_| ())
    }

    async fn delete_unclaimed_tag(&self, tag_id: Uuid) -> anyhow::Result<bool> {
        let rows = self
            .mutate(
                reqwest::Method::DELETE,
                "tags",
                &[
                    ("id", format!("eq.{tag_id}")),
                    ("activated", "eq.false".into()),
                    ("pet_id", "is.null".into()),
                    ("user_id", "is.null".into()),
                ],
                None,
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn link_tag_to_pet(
        &self,
        tag_id: Uuid,
        pet_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        let rows = self
            .mutate(
                reqwest::Method::PATCH,
                "tags",
                &[
                    ("id", format!("eq.{tag_id}")),
                    (
                        "and",
                        format!(
                            "(or(user_id.is.null,user_id.eq.{user_id}),or(activated.is.false,user_id.eq.{user_id},pet_id.is.null))"
                        ),
                    ),
                ],
                Some(json!({
                    "pet_id": pet_id,
                    "user_id": user_id,
                    "activated": true,
                    "activated_at": Utc::now(),
                })),
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn unlink_pet_tags(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        self.mutate(
            reqwest::Method::PATCH,
            "tags",
            &[
                ("pet_id", format!("eq.{pet_id}")),
                ("user_id", format!("eq.{user_id}")),
            ],
            Some(json!({
                "pet_id": null,
                "user_id": null,
                "activated": false,
                "activated_at": null,
            })),
        )
        .await
        .map(|_| ())
    }

    async fn get_pet_by_id(&self, pet_id: Uuid) -> anyhow::Result<Option<models::pet::Pet>> {
        let mut rows: Vec<models::pet::Pet> = self
            .select(
                "pets",
                &[("select", "*".into()), ("id", format!("eq.{pet_id}"))],
            )
            .await?;

        Ok(rows.pop())
    }

    async fn insert_pet(&self, pet: &models::pet::Pet) -> anyhow::Result<Uuid> {
        self.send(
            self.request(reqwest::Method::POST, self.table_url("pets"))
                .json(pet),
        )
        .await?;

        Ok(pet.id)
    }

    async fn update_pet(&self, pet: &models::pet::Pet, user_id: Uuid) -> anyhow::Result<bool> {
        let rows = self
            .mutate(
                reqwest::Method::PATCH,
                "pets",
                &[
                    ("id", format!("eq.{}", pet.id)),
                    ("user_id", format!("eq.{user_id}")),
                ],
                Some(json!({
                    "name": pet.name,
                    "type": pet.pet_type,
                    "breed": pet.breed,
                    "owner_name": pet.owner_name,
                    "owner_contact": pet.owner_contact,
                    "owner_phone": pet.owner_phone,
                    "notes": pet.notes,
                    "qr_activated": pet.qr_activated,
                    "updated_at": Utc::now(),
                })),
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn delete_pet(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        self.mutate(
            reqwest::Method::DELETE,
            "pets",
            &[
                ("id", format!("eq.{pet_id}")),
                ("user_id", format!("eq.{user_id}")),
            ],
            None,
        )
        .await
        .map(|_| ())
    }

    async fn get_user_pets(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<models::pet::PetWithTags>> {
        self.select(
            "pets",
            &[
                ("select", "*,tags(*)".into()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn get_user_by_id(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<models::user_app::User>> {
        let mut rows: Vec<models::user_app::User> = self
            .select(
                "users",
                &[("select", "*".into()), ("id", format!("eq.{user_id}"))],
            )
            .await?;

        Ok(rows.pop())
    }

    async fn upsert_user(&self, user: &models::user_app::User) -> anyhow::Result<()> {
        // account_role is assigned server side and never sent from here
        self.send(
            self.request(reqwest::Method::POST, self.table_url("users"))
                .header("Prefer", "resolution=merge-duplicates")
                .json(&json!({
                    "id": user.id,
                    "email": user.email,
                    "full_name": user.full_name,
                    "phone": user.phone,
                    "updated_at": user.updated_at,
                })),
        )
        .await
        .map(|_| ())
    }

    async fn get_admin_stats(&self) -> anyhow::Result<models::admin::AdminStats> {
        self.rpc("get_admin_stats", json!({})).await
    }

    async fn list_users(&self) -> anyhow::Result<Vec<models::user_app::User>> {
        self.rpc("list_all_users", json!({})).await
    }

    async fn verify_user_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<models::admin::UserVerification>> {
        self.rpc("verify_user_by_email", json!({ "p_email": email }))
            .await
    }

    async fn search_user_emails(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        self.rpc(
            "search_user_emails",
            json!({ "p_fragment": fragment, "p_limit": limit }),
        )
        .await
    }

    async fn get_integrity_report(&self) -> anyhow::Result<Vec<models::admin::IntegrityIssue>> {
        self.rpc("get_integrity_issues", json!({})).await
    }

    async fn fix_integrity_issues(
        &self,
    ) -> anyhow::Result<Vec<models::admin::IntegrityFixOutcome>> {
        self.rpc("fix_integrity_issues", json!({})).await
    }

    async fn mark_tag_nfc(&self, code: &str, has_nfc: bool) -> anyhow::Result<bool> {
        self.rpc(
            "mark_tag_nfc",
            json!({ "p_code": code, "p_has_nfc": has_nfc }),
        )
        .await
    }

    async fn get_nfc_stats(&self) -> anyhow::Result<models::admin::NfcStats> {
        self.rpc("get_nfc_stats", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert_eq!(
            classify_error(reqwest::StatusCode::FORBIDDEN, ""),
            StoreError::PermissionDenied
        );
        assert_eq!(
            classify_error(
                reqwest::StatusCode::UNAUTHORIZED,
                r#"{"code":"42501","message":"new row violates row-level security policy"}"#
            ),
            StoreError::PermissionDenied
        );
        assert_eq!(
            classify_error(
                reqwest::StatusCode::CONFLICT,
                r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#
            ),
            StoreError::Conflict("duplicate key value violates unique constraint".into())
        );
        assert!(matches!(
            classify_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            StoreError::Transport(msg) if msg.contains("upstream down")
        ));
    }

    #[test]
    fn test_escape_ilike() {
        assert_eq!(escape_ilike("PLK_1%*"), "PLK\\_1\\%\\*");
    }

    #[test]
    fn test_tag_record_from_embedded_json() {
        let record: models::tag::TagRecord = serde_json::from_value(json!({
            "id": "6f1d7f3c-4a59-4a38-9c5d-2f0a8f4b7e11",
            "code": "PLK-ABC123",
            "activated": false,
            "activated_at": null,
            "pet_id": null,
            "user_id": null,
            "created_at": "2026-01-10T12:00:00Z",
            "pets": null
        }))
        .unwrap();

        assert_eq!(record.tag.code, "PLK-ABC123");
        assert!(!record.tag.has_nfc);
        assert!(record.pet.is_none());
    }
}

use crate::models;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AuthError, AuthService};

/// GoTrue error body, both the legacy and the current shapes
#[derive(Deserialize, Default)]
struct GoTrueError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    msg: String,
}

pub fn classify_auth_error(status: reqwest::StatusCode, body: &str) -> AuthError {
    let error = serde_json::from_str::<GoTrueError>(body).unwrap_or_default();

    match (error.error.as_str(), error.error_code.as_str()) {
        ("invalid_grant", _) | (_, "invalid_credentials") => AuthError::InvalidCredentials,
        (_, "user_already_exists") | (_, "email_exists") => AuthError::EmailTaken,
        _ if error.msg.contains("already registered") => AuthError::EmailTaken,
        _ => AuthError::Transport(format!("{status}: {body}")),
    }
}

/// Hosted auth (Supabase GoTrue) over its REST api
#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: crate::utils::REQUEST_CLIENT.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Err(classify_auth_error(status, &body).into())
    }
}

/// Signup answers with a session, or with the bare user while the email
/// confirmation is pending
pub fn parse_sign_up_body(body: Value) -> anyhow::Result<Option<models::user_app::AuthSession>> {
    if body.get("access_token").is_none() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(body)?))
}

#[async_trait]
impl AuthService for SupabaseAuth {
    async fn get_session(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<models::user_app::AuthUser>> {
        let response = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if matches!(
            response.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_auth_error(status, &body).into());
        }

        Ok(Some(response.json().await?))
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<models::user_app::AuthSession> {
        let response = self
            .send(
                self.request(reqwest::Method::POST, "/token")
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        Ok(response.json().await?)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &models::user_app::SignUpProfile,
    ) -> anyhow::Result<Option<models::user_app::AuthSession>> {
        let response = self
            .send(self.request(reqwest::Method::POST, "/signup").json(&json!({
                "email": email,
                "password": password,
                "data": profile,
            })))
            .await?;

        parse_sign_up_body(response.json().await?)
    }

    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()> {
        self.send(
            self.request(reqwest::Method::POST, "/logout")
                .bearer_auth(access_token),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_error() {
        assert_eq!(
            classify_auth_error(
                reqwest::StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            classify_auth_error(
                reqwest::StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#
            ),
            AuthError::EmailTaken
        );
        assert!(matches!(
            classify_auth_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            AuthError::Transport(_)
        ));
    }

    #[test]
    fn test_sign_up_pending_confirmation() {
        let pending = json!({
            "id": "6a1f0b9e-3c8d-4f2a-9e7b-1c2d3e4f5a6b",
            "email": "ana@plakita.app",
            "user_metadata": {"full_name": "Ana"}
        });
        assert!(parse_sign_up_body(pending).unwrap().is_none());

        let session = json!({
            "access_token": "token",
            "user": {
                "id": "6a1f0b9e-3c8d-4f2a-9e7b-1c2d3e4f5a6b",
                "email": "ana@plakita.app",
                "user_metadata": {"full_name": "Ana", "phone": "5512345678"}
            }
        });
        let session = parse_sign_up_body(session).unwrap().unwrap();
        assert_eq!(session.access_token, "token");
        assert_eq!(session.user.metadata_str("phone").as_deref(), Some("5512345678"));
    }
}

//! # User API Module
//!
//! Sign in, sign up and sign out against the auth provider, mirroring the
//! authenticated user into the application `users` table.

use super::{
    errors::{ActionError, FieldErrors},
    validation,
};
use crate::{front, metric, models, repo, services};

/// Authenticated user plus the provider token kept in the identity cookie
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub user: models::user_app::User,
    pub access_token: String,
}

/// Gets the application profile of an authenticated user, creating it from
/// the auth metadata on first sign in. The stored role is never overwritten.
///
/// # Arguments
/// * `auth_user` - User as returned by the auth provider
/// * `repo` - Repository instance for database operations
///
/// # Returns
/// * `anyhow::Result<models::user_app::User>` - The existing or newly created profile
pub async fn get_or_create_profile(
    auth_user: &models::user_app::AuthUser,
    repo: &repo::ImplAppRepo,
) -> anyhow::Result<models::user_app::User> {
    if let Some(user) = repo.get_user_by_id(auth_user.id).await? {
        return Ok(user);
    }

    let user = models::user_app::User::create_default_from_auth(auth_user);
    repo.upsert_user(&user).await?;

    metric::incr_user_action_statds("create_user");
    Ok(user)
}

pub async fn sign_in(
    form: &front::forms::user::LoginForm,
    auth_service: &services::ImplAuthService,
    repo: &repo::ImplAppRepo,
    session_events: &services::SessionEvents,
) -> Result<SignedIn, ActionError> {
    let email = form.email.trim().to_lowercase();

    let mut field_errors = FieldErrors::new();
    if !validation::is_valid_email(&email) {
        field_errors.insert("email", "Enter a valid email address".into());
    }
    if form.password.is_empty() {
        field_errors.insert("password", "Enter your password".into());
    }
    if !field_errors.is_empty() {
        return Err(ActionError::Validation(field_errors));
    }

    let session = auth_service
        .sign_in(&email, &form.password)
        .await
        .map_err(ActionError::from_store)?;

    let user = get_or_create_profile(&session.user, repo)
        .await
        .map_err(ActionError::from_store)?;

    session_events.publish(services::SessionEvent::SignedIn, Some(user.clone()));
    Ok(SignedIn {
        user,
        access_token: session.access_token,
    })
}

/// Registers a new account. `Ok(None)` means the provider sent a
/// confirmation email and no session exists yet.
pub async fn sign_up(
    form: &front::forms::user::RegisterForm,
    auth_service: &services::ImplAuthService,
    repo: &repo::ImplAppRepo,
    session_events: &services::SessionEvents,
) -> Result<Option<SignedIn>, ActionError> {
    let field_errors = validation::validate_register_form(form);
    if !field_errors.is_empty() {
        return Err(ActionError::Validation(field_errors));
    }

    let profile = models::user_app::SignUpProfile {
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
    };

    let session = auth_service
        .sign_up(&form.email.trim().to_lowercase(), &form.password, &profile)
        .await
        .map_err(ActionError::from_store)?;

    let Some(session) = session else {
        session_events.publish(services::SessionEvent::SignedUp, None);
        return Ok(None);
    };

    let user = get_or_create_profile(&session.user, repo)
        .await
        .map_err(ActionError::from_store)?;

    session_events.publish(services::SessionEvent::SignedUp, Some(user.clone()));
    Ok(Some(SignedIn {
        user,
        access_token: session.access_token,
    }))
}

/// True while the provider still resolves `access_token` to `user_id`.
/// Expired or revoked tokens, and tokens of another user, are not live.
pub async fn is_session_live(
    user_id: uuid::Uuid,
    access_token: &str,
    auth_service: &services::ImplAuthService,
) -> Result<bool, ActionError> {
    let auth_user = auth_service
        .get_session(access_token)
        .await
        .map_err(ActionError::from_store)?;

    Ok(auth_user.is_some_and(|u| u.id == user_id))
}

/// Revokes the provider token. The identity cookie is dropped by the caller
/// even when the provider call fails.
pub async fn sign_out(
    signed_in: SignedIn,
    auth_service: &services::ImplAuthService,
    session_events: &services::SessionEvents,
) -> Result<(), ActionError> {
    let result = auth_service
        .sign_out(&signed_in.access_token)
        .await
        .map_err(ActionError::from_store);

    session_events.publish(services::SessionEvent::SignedOut, Some(signed_in.user));
    result
}

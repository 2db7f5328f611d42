//! Staff-only operations. Every entry point re-reads the caller role from
//! the store through [ensure_admin] instead of trusting the session cookie.

use super::{errors::ActionError, tag::normalize_code, validation};
use crate::{consts, metric, models, repo};
use serde::Serialize;
use uuid::Uuid;

/// Returns the fresh profile of `user_id` when it still has the staff role
pub async fn ensure_admin(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<models::user_app::User, ActionError> {
    match repo
        .get_user_by_id(user_id)
        .await
        .map_err(ActionError::from_store)?
    {
        Some(user) if user.is_admin() => Ok(user),
        _ => Err(ActionError::PermissionDenied),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminOverview {
    pub stats: models::admin::AdminStats,
    pub nfc_stats: models::admin::NfcStats,
}

pub async fn get_overview(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<AdminOverview, ActionError> {
    ensure_admin(user_id, repo).await?;

    Ok(AdminOverview {
        stats: repo
            .get_admin_stats()
            .await
            .map_err(ActionError::from_store)?,
        nfc_stats: repo.get_nfc_stats().await.map_err(ActionError::from_store)?,
    })
}

pub async fn list_tags(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<Vec<models::tag::Tag>, ActionError> {
    ensure_admin(user_id, repo).await?;

    repo.get_all_tags().await.map_err(ActionError::from_store)
}

pub async fn get_tag(
    user_id: Uuid,
    tag_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<models::tag::Tag, ActionError> {
    ensure_admin(user_id, repo).await?;

    repo.get_tag_by_id(tag_id)
        .await
        .map_err(ActionError::from_store)?
        .ok_or_else(|| ActionError::NotFound {
            message: "The tag does not exist".into(),
            suggestions: vec![],
        })
}

pub async fn list_users(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<Vec<models::user_app::User>, ActionError> {
    ensure_admin(user_id, repo).await?;

    repo.list_users().await.map_err(ActionError::from_store)
}

/// Looks a user up by email. A miss carries similar emails, searched by the
/// local part of the address.
pub async fn verify_user(
    user_id: Uuid,
    email: &str,
    repo: &repo::ImplAppRepo,
) -> Result<models::admin::UserVerification, ActionError> {
    ensure_admin(user_id, repo).await?;

    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ActionError::Validation(super::errors::FieldErrors::from([(
            "email",
            "Enter the email to verify".to_string(),
        )])));
    }

    if let Some(verification) = repo
        .verify_user_by_email(&email)
        .await
        .map_err(ActionError::from_store)?
    {
        return Ok(verification);
    }

    let fragment = email.split('@').next().unwrap_or_default();
    let suggestions = match fragment.is_empty() {
        true => vec![],
        false => repo
            .search_user_emails(fragment, consts::PARTIAL_MATCH_LIMIT)
            .await
            .map_err(ActionError::from_store)?,
    };

    Err(ActionError::NotFound {
        message: match validation::is_valid_email(&email) {
            true => format!("No user registered with {email}"),
            false => format!("{email} is not a valid email, showing similar accounts"),
        },
        suggestions,
    })
}

pub async fn mark_tag_nfc(
    user_id: Uuid,
    raw_code: &str,
    has_nfc: bool,
    repo: &repo::ImplAppRepo,
) -> Result<String, ActionError> {
    ensure_admin(user_id, repo).await?;

    let code = normalize_code(raw_code);
    let marked = repo
        .mark_tag_nfc(&code, has_nfc)
        .await
        .map_err(ActionError::from_store)?;

    if !marked {
        return Err(ActionError::NotFound {
            message: format!("No tag with code {code} was found"),
            suggestions: vec![],
        });
    }

    metric::incr_tag_action_statds("mark_nfc");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{MockAppRepo, sqlite::tests::test_user};
    use mockall::predicate::*;

    fn staff() -> models::user_app::User {
        models::user_app::User {
            account_role: models::user_app::AccountRole::Staff,
            ..test_user("staff@plakita.app")
        }
    }

    #[ntex::test]
    async fn test_regular_user_is_denied_before_any_query() {
        let user = test_user("jo@example.com");
        let user_id = user.id;

        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(user.clone())));
        mock.expect_get_admin_stats().never();
        mock.expect_list_users().never();

        let repo: repo::ImplAppRepo = Box::new(mock);

        assert_eq!(
            get_overview(user_id, &repo).await.unwrap_err(),
            ActionError::PermissionDenied
        );
        assert_eq!(
            list_users(user_id, &repo).await.unwrap_err(),
            ActionError::PermissionDenied
        );
    }

    #[ntex::test]
    async fn test_unknown_user_is_denied() {
        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id().returning(|_| Ok(None));

        let repo: repo::ImplAppRepo = Box::new(mock);

        assert_eq!(
            ensure_admin(Uuid::new_v4(), &repo).await.unwrap_err(),
            ActionError::PermissionDenied
        );
    }

    #[ntex::test]
    async fn test_verify_missing_user_suggests_similar_emails() {
        let admin = staff();
        let admin_id = admin.id;

        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id()
            .returning(move |_| Ok(Some(admin.clone())));
        mock.expect_verify_user_by_email()
            .with(eq("ana@correo.mx"))
            .returning(|_| Ok(None));
        mock.expect_search_user_emails()
            .with(eq("ana"), eq(consts::PARTIAL_MATCH_LIMIT))
            .returning(|_, _| Ok(vec!["ana@gmail.com".into()]));

        let repo: repo::ImplAppRepo = Box::new(mock);

        assert_eq!(
            verify_user(admin_id, " Ana@Correo.mx ", &repo)
                .await
                .unwrap_err(),
            ActionError::NotFound {
                message: "No user registered with ana@correo.mx".into(),
                suggestions: vec!["ana@gmail.com".into()],
            }
        );
    }

    #[ntex::test]
    async fn test_mark_unknown_tag_nfc() {
        let admin = staff();
        let admin_id = admin.id;

        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id()
            .returning(move |_| Ok(Some(admin.clone())));
        mock.expect_mark_tag_nfc()
            .with(eq("PLK-ABC123"), eq(true))
            .returning(|_, _| Ok(false));

        let repo: repo::ImplAppRepo = Box::new(mock);

        assert!(matches!(
            mark_tag_nfc(admin_id, "plk-abc123", true, &repo).await,
            Err(ActionError::NotFound { .. })
        ));
    }
}

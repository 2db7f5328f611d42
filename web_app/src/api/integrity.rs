//! Detection and repair of activated tags whose references don't hold.
//!
//! Both the report and the repair run in the store, this module gates them
//! behind the staff role and summarizes the outcome.

use super::{admin::ensure_admin, errors::ActionError};
use crate::{metric, models, repo};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IntegrityReport {
    pub issues: Vec<models::admin::IntegrityIssue>,
    pub orphaned: usize,
    pub ownerless: usize,
    pub mismatched: usize,
}

impl From<Vec<models::admin::IntegrityIssue>> for IntegrityReport {
    fn from(issues: Vec<models::admin::IntegrityIssue>) -> Self {
        let count = |kind| issues.iter().filter(|i| i.kind == kind).count();

        Self {
            orphaned: count(models::admin::IntegrityIssueKind::OrphanedActivation),
            ownerless: count(models::admin::IntegrityIssueKind::OwnerlessActivation),
            mismatched: count(models::admin::IntegrityIssueKind::OwnerMismatch),
            issues,
        }
    }
}

pub async fn scan(user_id: Uuid, repo: &repo::ImplAppRepo) -> Result<IntegrityReport, ActionError> {
    let _span = logfire::span!("integrity_scan").entered();
    ensure_admin(user_id, repo).await?;

    let report: IntegrityReport = repo
        .get_integrity_report()
        .await
        .map_err(ActionError::from_store)?
        .into();

    metric::incr_integrity_statds("scan");
    Ok(report)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IntegrityFixSummary {
    pub outcomes: Vec<models::admin::IntegrityFixOutcome>,
    pub fixed: usize,
    pub failed: usize,
}

/// Runs the repair once. Failed entries are left for manual review.
pub async fn fix(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<IntegrityFixSummary, ActionError> {
    let _span = logfire::span!("integrity_fix").entered();
    ensure_admin(user_id, repo).await?;

    let outcomes = repo
        .fix_integrity_issues()
        .await
        .map_err(ActionError::from_store)?;

    let fixed = outcomes.iter().filter(|o| o.success).count();
    let failed = outcomes.len() - fixed;

    for outcome in outcomes.iter().filter(|o| !o.success) {
        logfire::warn!(
            "integrity fix failed for {code}: {error}",
            code = outcome.code.to_string(),
            error = outcome.error.clone().unwrap_or_default()
        );
    }
    metric::incr_integrity_statds(if failed == 0 { "fixed" } else { "partially_fixed" });

    Ok(IntegrityFixSummary {
        outcomes,
        fixed,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{AppRepo, MockAppRepo, sqlite::tests::*};

    fn staff() -> models::user_app::User {
        models::user_app::User {
            account_role: models::user_app::AccountRole::Staff,
            ..test_user("staff@plakita.app")
        }
    }

    #[ntex::test]
    async fn test_scan_requires_staff() {
        let user = test_user("jo@example.com");
        let user_id = user.id;

        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        mock.expect_get_integrity_report().never();
        mock.expect_fix_integrity_issues().never();

        let repo: repo::ImplAppRepo = Box::new(mock);

        assert_eq!(
            scan(user_id, &repo).await.unwrap_err(),
            ActionError::PermissionDenied
        );
        assert_eq!(
            fix(user_id, &repo).await.unwrap_err(),
            ActionError::PermissionDenied
        );
    }

    #[ntex::test]
    async fn test_fix_summary_counts_failures() {
        let admin = staff();
        let admin_id = admin.id;

        let mut mock = MockAppRepo::new();
        mock.expect_get_user_by_id()
            .returning(move |_| Ok(Some(admin.clone())));
        mock.expect_fix_integrity_issues().times(1).returning(|| {
            Ok(vec![
                models::admin::IntegrityFixOutcome {
                    tag_id: Uuid::new_v4(),
                    code: "PLK-AAA111".into(),
                    success: true,
                    action: "deactivated".into(),
                    error: None,
                },
                models::admin::IntegrityFixOutcome {
                    tag_id: Uuid::new_v4(),
                    code: "PLK-BBB222".into(),
                    success: false,
                    action: "manual_review".into(),
                    error: Some("pet owner does not resolve".into()),
                },
            ])
        });

        let repo: repo::ImplAppRepo = Box::new(mock);
        let summary = fix(admin_id, &repo).await.unwrap();

        assert_eq!((summary.fixed, summary.failed), (1, 1));
    }

    #[tokio::test]
    async fn test_orphaned_activation_is_reported_and_deactivated() {
        let sqlite = memory_repo().await;
        let admin = staff();
        let owner = test_user("jo@example.com");
        let pet = test_pet(owner.id);
        let tag = models::tag::Tag::new_unclaimed("PLK-ABC123", false);

        sqlite.upsert_user(&admin).await.unwrap();
        sqlx::query("UPDATE users SET account_role = 'staff' WHERE id = $1")
            .bind(admin.id.to_string())
            .execute(&sqlite.db_pool)
            .await
            .unwrap();
        sqlite.upsert_user(&owner).await.unwrap();
        sqlite.insert_pet(&pet).await.unwrap();
        sqlite.insert_tag(&tag).await.unwrap();
        sqlite.link_tag_to_pet(tag.id, pet.id, owner.id).await.unwrap();
        sqlite.delete_pet(pet.id, owner.id).await.unwrap();

        let repo: repo::ImplAppRepo = Box::new(sqlite);

        let report = scan(admin.id, &repo).await.unwrap();
        assert_eq!(report.orphaned, 1);
        assert_eq!(report.issues[0].code, "PLK-ABC123");
        assert_eq!(
            report.issues[0].kind,
            models::admin::IntegrityIssueKind::OrphanedActivation
        );

        let summary = fix(admin.id, &repo).await.unwrap();
        assert_eq!((summary.fixed, summary.failed), (1, 0));

        let repaired = repo.get_tag_by_id(tag.id).await.unwrap().unwrap();
        assert!(!repaired.activated);
        assert!(repaired.pet_id.is_none());
        assert!(repaired.activated_at.is_none());
        assert!(scan(admin.id, &repo).await.unwrap().issues.is_empty());
    }
}

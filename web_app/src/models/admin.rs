use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user_app::User;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminStats {
    pub total_tags: i64,
    pub activated_tags: i64,
    pub unclaimed_tags: i64,
    pub claimed_not_completed_tags: i64,
    pub total_pets: i64,
    pub total_users: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NfcStats {
    pub nfc_tags: i64,
    pub activated_nfc_tags: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserVerification {
    pub user: User,
    pub pets_count: i64,
    pub tags_count: i64,
}

#[derive(Debug, Display, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntegrityIssueKind {
    /// activated but the pet does not resolve
    #[display("orphaned_activation")]
    #[serde(rename = "orphaned_activation")]
    OrphanedActivation,
    /// activated but the claiming user does not resolve
    #[display("ownerless_activation")]
    #[serde(rename = "ownerless_activation")]
    OwnerlessActivation,
    /// activated, pet resolves, but belongs to another user
    #[display("owner_mismatch")]
    #[serde(rename = "owner_mismatch")]
    OwnerMismatch,
}

impl IntegrityIssueKind {
    /// Classifies an activated tag given what its references resolve to.
    ///
    /// `pet_owner` is the `user_id` of the linked pet when the pet row exists.
    pub fn classify(
        tag_user_id: Option<Uuid>,
        pet_owner: Option<Uuid>,
        user_exists: bool,
    ) -> Option<Self> {
        let Some(pet_owner) = pet_owner else {
            return Some(Self::OrphanedActivation);
        };

        if tag_user_id.is_none() || !user_exists {
            return Some(Self::OwnerlessActivation);
        }

        if tag_user_id != Some(pet_owner) {
            return Some(Self::OwnerMismatch);
        }

        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityIssue {
    pub tag_id: Uuid,
    pub code: String,
    pub kind: IntegrityIssueKind,
    pub pet_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityFixOutcome {
    pub tag_id: Uuid,
    pub code: String,
    pub success: bool,
    pub action: String,
    #[serde(default)]
    pub error: Option<String>,
}

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pet::Pet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub code: String,
    pub activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub pet_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub has_nfc: bool,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new_unclaimed(code: &str, has_nfc: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.to_string(),
            activated: false,
            activated_at: None,
            pet_id: None,
            user_id: None,
            has_nfc,
            created_at: Utc::now(),
        }
    }

    /// Only tags nobody touched yet can be removed from the store
    pub fn is_deletable(&self) -> bool {
        !self.activated && self.pet_id.is_none() && self.user_id.is_none()
    }

    /// A user started the claim form but the tag is not active yet
    pub fn is_claimed_not_completed(&self) -> bool {
        self.user_id.is_some() && !self.activated
    }

    pub fn is_claimed_by_other(&self, user_id: Option<Uuid>) -> bool {
        self.user_id.is_some_and(|owner| Some(owner) != user_id)
    }

    pub fn status(&self) -> TagStatus {
        match (self.activated, self.pet_id.is_some()) {
            (true, true) => TagStatus::Active,
            (true, false) => TagStatus::ActiveWithoutPet,
            _ if self.is_claimed_not_completed() => TagStatus::ClaimPending,
            _ => TagStatus::Unclaimed,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    #[display("unclaimed")]
    Unclaimed,
    #[display("claimed, profile pending")]
    ClaimPending,
    #[display("active")]
    Active,
    #[display("active, no pet")]
    ActiveWithoutPet,
}

/// A tag row with its linked pet, when the pet resolves
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagRecord {
    #[serde(flatten)]
    pub tag: Tag,
    #[serde(default, rename = "pets")]
    pub pet: Option<Pet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_claim_started_without_activation() {
        let mut tag = Tag::new_unclaimed("PLK-ABC123", false);
        assert_eq!(tag.status(), TagStatus::Unclaimed);

        tag.user_id = Some(Uuid::new_v4());
        assert!(tag.is_claimed_not_completed());
        assert_eq!(tag.status(), TagStatus::ClaimPending);
        assert!(!tag.is_deletable());

        tag.activated = true;
        assert_eq!(tag.status(), TagStatus::ActiveWithoutPet);

        tag.pet_id = Some(Uuid::new_v4());
        assert_eq!(tag.status().to_string(), "active");
    }
}

use crate::models;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Html forms send an empty string for a missing hidden id
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Activation form: the pet fields plus its owner contact channels
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClaimPetForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub pet_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pet_type: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub owner_contact: String,
    #[serde(default)]
    pub owner_phone: String,
    #[serde(default)]
    pub notes: String,
}

impl ClaimPetForm {
    /// Owner fields taken from the signed in profile, pet fields left blank
    pub fn prefilled_for(user: &models::user_app::User) -> Self {
        Self {
            owner_name: user.full_name.to_string(),
            owner_contact: user.email.to_string(),
            owner_phone: user.phone.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Strips markup from every free text field
    pub fn sanitized(self) -> Self {
        Self {
            pet_id: self.pet_id,
            name: ammonia::clean(self.name.trim()),
            pet_type: self.pet_type.trim().to_lowercase(),
            breed: ammonia::clean(self.breed.trim()),
            owner_name: ammonia::clean(self.owner_name.trim()),
            owner_contact: ammonia::clean(self.owner_contact.trim()),
            owner_phone: ammonia::clean(self.owner_phone.trim()),
            notes: ammonia::clean(self.notes.trim()),
        }
    }

    /// Builds the pet row owned by `user_id`. `pet_type` must be validated first.
    pub fn to_pet(&self, pet_id: Uuid, user_id: Uuid) -> anyhow::Result<models::pet::Pet> {
        let now = chrono::Utc::now();

        Ok(models::pet::Pet {
            id: pet_id,
            name: self.name.trim().to_string(),
            pet_type: self.pet_type.parse()?,
            breed: self.breed.trim().to_string(),
            owner_name: self.owner_name.trim().to_string(),
            owner_contact: self.owner_contact.trim().to_string(),
            owner_phone: self.owner_phone.trim().to_string(),
            notes: self.notes.trim().to_string(),
            qr_activated: true,
            user_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl From<&models::pet::Pet> for ClaimPetForm {
    fn from(pet: &models::pet::Pet) -> Self {
        Self {
            pet_id: Some(pet.id),
            name: pet.name.to_string(),
            pet_type: pet.pet_type.to_string(),
            breed: pet.breed.to_string(),
            owner_name: pet.owner_name.to_string(),
            owner_contact: pet.owner_contact.to_string(),
            owner_phone: pet.owner_phone.to_string(),
            notes: pet.notes.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

impl ConfirmForm {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.confirm.as_deref(), Some("true" | "on" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pet_id_is_none() {
        let form: ClaimPetForm =
            serde_json::from_str(r#"{"pet_id": "", "name": "Rex"}"#).unwrap();
        assert_eq!(form.pet_id, None);

        let id = Uuid::new_v4();
        let form: ClaimPetForm =
            serde_json::from_str(&format!(r#"{{"pet_id": "{id}", "name": "Rex"}}"#)).unwrap();
        assert_eq!(form.pet_id, Some(id));
    }

    #[test]
    fn test_sanitized_strips_markup() {
        let form = ClaimPetForm {
            name: " <script>alert(1)</script>Rex ".into(),
            pet_type: " Dog ".into(),
            ..Default::default()
        }
        .sanitized();

        assert_eq!(form.name, "Rex");
        assert_eq!(form.pet_type, "dog");
    }
}

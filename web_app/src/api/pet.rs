//! # Pet API Module
//!
//! Owner side of the pets: the dashboard listing, the owner profile view and
//! the removal of a pet together with the release of its tags.

use super::errors::ActionError;
use crate::{metric, models, repo};
use uuid::Uuid;

/// Retrieves all pets belonging to a user with their linked tags.
///
/// # Arguments
/// * `user_id` - ID of the signed in owner
/// * `repo` - Repository instance for database operations
///
/// # Returns
/// * `Result<Vec<models::pet::PetWithTags>, ActionError>` - Pets in dashboard order
pub async fn get_user_dashboard(
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<Vec<models::pet::PetWithTags>, ActionError> {
    repo.get_user_pets(user_id)
        .await
        .map_err(ActionError::from_store)
}

/// Retrieves a pet only when `user_id` owns it.
///
/// # Arguments
/// * `pet_id` - ID of the pet to retrieve
/// * `user_id` - ID of the user asking for it
/// * `repo` - Repository instance for database operations
///
/// # Errors
/// * [ActionError::NotFound] - the pet does not exist
/// * [ActionError::PermissionDenied] - the pet belongs to another user
pub async fn get_owned_pet(
    pet_id: Uuid,
    user_id: Uuid,
    repo: &repo::ImplAppRepo,
) -> Result<models::pet::PetWithTags, ActionError> {
    let pet = repo
        .get_pet_by_id(pet_id)
        .await
        .map_err(ActionError::from_store)?
        .ok_or_else(|| ActionError::NotFound {
            message: "The pet does not exist".into(),
            suggestions: vec![],
        })?;

    if pet.user_id != user_id {
        return Err(ActionError::PermissionDenied);
    }

    let tags = repo
        .get_user_pets(user_id)
        .await
        .map_err(ActionError::from_store)?
        .into_iter()
        .find(|p| p.pet.id == pet_id)
        .map(|p| p.tags)
        .unwrap_or_default();

    Ok(models::pet::PetWithTags { pet, tags })
}

/// Releases every tag of the pet and then deletes it.
///
/// The tags go back to the unclaimed state (`pet_id`, `user_id` and
/// `activated_at` cleared) so they can be claimed again.
///
/// # Arguments
/// * `pet_id` - ID of the pet to delete
/// * `user_id` - ID of the owner
/// * `confirmed` - the user went through the confirmation page
/// * `repo` - Repository instance for database operations
///
/// # Errors
/// * [ActionError::NeedsConfirmation] - nothing was written
pub async fn delete_pet_and_unlink(
    pet_id: Uuid,
    user_id: Uuid,
    confirmed: bool,
    repo: &repo::ImplAppRepo,
) -> Result<models::pet::Pet, ActionError> {
    let _span = logfire::span!("delete_pet_and_unlink").entered();

    let pet = get_owned_pet(pet_id, user_id, repo).await?.pet;

    if !confirmed {
        return Err(ActionError::NeedsConfirmation);
    }

    repo.unlink_pet_tags(pet_id, user_id)
        .await
        .map_err(ActionError::from_store)?;
    repo.delete_pet(pet_id, user_id)
        .await
        .map_err(ActionError::from_store)?;

    metric::incr_tag_action_statds("unlink");
    Ok(pet)
}

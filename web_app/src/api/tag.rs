//! # Tag API Module
//!
//! Resolution of a scanned or typed tag code and the claim workflow that
//! links a tag to a pet. Lookup runs an ordered chain of strategies, the
//! claim state is derived from the tag row and the visitor, and the claim
//! commit is a two step saga (pet write, then tag write).

use super::{errors::ActionError, validation};
use crate::{consts, front, metric, models, repo};
use derive_more::Display;
use futures::future::BoxFuture;
use serde::Serialize;
use uuid::Uuid;

/// Trim and uppercase. Idempotent.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub type LookupStrategy = for<'a> fn(
    &'a repo::ImplAppRepo,
    &'a str,
) -> BoxFuture<'a, anyhow::Result<Vec<models::tag::TagRecord>>>;

fn exact_match<'a>(
    repo: &'a repo::ImplAppRepo,
    code: &'a str,
) -> BoxFuture<'a, anyhow::Result<Vec<models::tag::TagRecord>>> {
    repo.find_tags_by_code(code)
}

fn case_insensitive_match<'a>(
    repo: &'a repo::ImplAppRepo,
    code: &'a str,
) -> BoxFuture<'a, anyhow::Result<Vec<models::tag::TagRecord>>> {
    repo.find_tags_by_code_ilike(code)
}

/// Tried in order, the first strategy returning rows wins
pub const LOOKUP_STRATEGIES: [(&str, LookupStrategy); 2] = [
    ("exact", exact_match),
    ("case_insensitive", case_insensitive_match),
];

pub const EMPTY_STORE_MESSAGE: &str = "There are no tags registered yet";

fn not_found_message(code: &str) -> String {
    format!("No tag with code {code} was found")
}

fn single_record(
    mut records: Vec<models::tag::TagRecord>,
    code: &str,
) -> Result<Option<models::tag::TagRecord>, ActionError> {
    match records.len() {
        0 => Ok(None),
        1 => Ok(records.pop()),
        n => Err(ActionError::IntegrityDefect(format!(
            "{n} tags share the code {code}"
        ))),
    }
}

fn blank_code_error() -> ActionError {
    ActionError::Validation(super::errors::FieldErrors::from([(
        "code",
        "Enter the code printed on your tag".to_string(),
    )]))
}

/// Runs the strategy chain for an already normalized code
async fn find_unique(
    code: &str,
    repo: &repo::ImplAppRepo,
) -> Result<Option<models::tag::TagRecord>, ActionError> {
    for (strategy_name, strategy) in LOOKUP_STRATEGIES {
        let records = strategy(repo, code)
            .await
            .map_err(ActionError::from_store)?;

        if let Some(record) = single_record(records, code)? {
            metric::incr_tag_action_statds(&format!("lookup_{strategy_name}"));
            return Ok(Some(record));
        }
    }

    Ok(None)
}

/// Finds the tag for a raw code typed or scanned by the visitor.
///
/// A miss returns [ActionError::NotFound] with similar codes as suggestions,
/// never auto selected. Store errors abort the cascade as they are.
pub async fn lookup_tag(
    raw_code: &str,
    repo: &repo::ImplAppRepo,
) -> Result<models::tag::TagRecord, ActionError> {
    let _span = logfire::span!("lookup_tag").entered();

    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(blank_code_error());
    }

    if let Some(record) = find_unique(&code, repo).await? {
        return Ok(record);
    }

    metric::incr_tag_action_statds("lookup_miss");

    let suggestions = repo
        .search_tag_codes(&code, consts::PARTIAL_MATCH_LIMIT)
        .await
        .map_err(ActionError::from_store)?;

    if suggestions.is_empty() && !repo.has_any_tag().await.map_err(ActionError::from_store)? {
        return Err(ActionError::NotFound {
            message: EMPTY_STORE_MESSAGE.to_string(),
            suggestions,
        });
    }

    Err(ActionError::NotFound {
        message: not_found_message(&code),
        suggestions,
    })
}

/// What the activation page does with a resolved tag
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimState {
    /// The visitor owns the linked pet
    Edit {
        form: front::forms::pet::ClaimPetForm,
    },
    /// Active tag seen by someone else, send them to the public profile
    Redirect { location: String },
    Claim {
        relink: bool,
        form: front::forms::pet::ClaimPetForm,
    },
    /// Another account already started the claim
    Reject,
    RequireRegistration { redirect_to: String },
}

pub fn public_profile_path(code: &str) -> String {
    format!("/info/{}", urlencoding::encode(code))
}

pub fn activation_path(code: &str) -> String {
    format!("/activate?code={}", urlencoding::encode(code))
}

pub fn registration_redirect(code: &str) -> String {
    format!(
        "/register?redirect_to={}",
        urlencoding::encode(&activation_path(code))
    )
}

/// Derives the claim state of a looked up tag for `actor`
pub fn resolve_claim_state(
    record: &models::tag::TagRecord,
    actor: Option<&models::user_app::User>,
) -> ClaimState {
    let tag = &record.tag;
    let actor_id = actor.map(|a| a.id);

    if let Some(pet) = &record.pet {
        if !tag.activated {
            return ClaimState::Claim {
                relink: true,
                form: Default::default(),
            };
        }

        if actor_id == Some(pet.user_id) {
            return ClaimState::Edit { form: pet.into() };
        }

        return ClaimState::Redirect {
            location: public_profile_path(&tag.code),
        };
    }

    if tag.is_claimed_by_other(actor_id) {
        return ClaimState::Reject;
    }

    match actor {
        None => ClaimState::RequireRegistration {
            redirect_to: registration_redirect(&tag.code),
        },
        Some(user) => ClaimState::Claim {
            relink: tag.activated,
            form: front::forms::pet::ClaimPetForm::prefilled_for(user),
        },
    }
}

/// Writes of a claim, in the order they are issued
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStep {
    #[display("save_pet")]
    SavePet,
    #[display("link_tag")]
    LinkTag,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClaimReceipt {
    pub tag_id: Uuid,
    pub code: String,
    pub pet_id: Uuid,
    pub created_pet: bool,
}

/// Saves the pet and links the tag to it.
///
/// The tag is re-read through the lookup chain and its claim state derived
/// again for `actor`, only `Claim` and `Edit` proceed to the writes.
///
/// Resubmitting after a [ActionError::PartialClaim] with the returned pet id
/// updates the same pet and retries the link.
pub async fn commit_claim(
    raw_code: &str,
    form: &front::forms::pet::ClaimPetForm,
    actor: &models::user_app::User,
    repo: &repo::ImplAppRepo,
) -> Result<ClaimReceipt, ActionError> {
    let _span = logfire::span!("commit_claim").entered();

    let field_errors = validation::validate_pet_form(form);
    if !field_errors.is_empty() {
        return Err(ActionError::Validation(field_errors));
    }

    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(blank_code_error());
    }

    let record = find_unique(&code, repo)
        .await?
        .ok_or_else(|| ActionError::NotFound {
            message: not_found_message(&code),
            suggestions: vec![],
        })?;

    match resolve_claim_state(&record, Some(actor)) {
        ClaimState::Claim { .. } | ClaimState::Edit { .. } => {}
        ClaimState::Redirect { .. } | ClaimState::Reject => {
            return Err(ActionError::AlreadyClaimed);
        }
        ClaimState::RequireRegistration { .. } => return Err(ActionError::PermissionDenied),
    }

    let linked_pet_id = record
        .pet
        .as_ref()
        .filter(|pet| pet.user_id == actor.id)
        .map(|pet| pet.id);

    let (pet_id, created_pet) = match form.pet_id.or(linked_pet_id) {
        None => {
            let pet = to_pet(form, Uuid::new_v4(), actor.id)?;
            let pet_id = repo
                .insert_pet(&pet)
                .await
                .map_err(ActionError::from_store)?;
            (pet_id, true)
        }
        Some(pet_id) => {
            let pet = to_pet(form, pet_id, actor.id)?;
            let updated = repo
                .update_pet(&pet, actor.id)
                .await
                .map_err(ActionError::from_store)?;
            if !updated {
                return Err(ActionError::PermissionDenied);
            }
            (pet_id, false)
        }
    };
    logfire::info!(
        "claim step {step} done pet={pet_id}",
        step = ClaimStep::SavePet.to_string(),
        pet_id = pet_id.to_string()
    );

    let linked = match repo.link_tag_to_pet(record.tag.id, pet_id, actor.id).await {
        Ok(linked) => linked,
        Err(err) => {
            logfire::error!(
                "claim step {step} failed: {error}",
                step = ClaimStep::LinkTag.to_string(),
                error = err.to_string()
            );
            metric::incr_tag_action_statds("claim_partial");
            return Err(ActionError::PartialClaim {
                pet_id,
                message: "Your pet was saved but the tag could not be linked yet. Submit the form again to retry".into(),
            });
        }
    };

    if !linked {
        return Err(ActionError::AlreadyClaimed);
    }

    metric::incr_tag_action_statds("claim");
    Ok(ClaimReceipt {
        tag_id: record.tag.id,
        code: record.tag.code,
        pet_id,
        created_pet,
    })
}

fn to_pet(
    form: &front::forms::pet::ClaimPetForm,
    pet_id: Uuid,
    user_id: Uuid,
) -> Result<models::pet::Pet, ActionError> {
    form.to_pet(pet_id, user_id).map_err(|e| {
        ActionError::Validation(super::errors::FieldErrors::from([(
            "pet_type",
            e.to_string(),
        )]))
    })
}

/// Random code like `PLK-3F9A1C`
pub fn generate_tag_code() -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}-{}",
        consts::TAG_CODE_PREFIX,
        &random[..consts::TAG_CODE_RANDOM_LEN]
    )
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

/// Creates unclaimed tags. An explicit code creates exactly one tag,
/// otherwise `count` codes are generated.
pub async fn create_tags(
    code: Option<&str>,
    count: u32,
    has_nfc: bool,
    repo: &repo::ImplAppRepo,
) -> Result<Vec<models::tag::Tag>, ActionError> {
    let codes = match code.map(normalize_code).filter(|c| !c.is_empty()) {
        Some(code) if !is_valid_code(&code) => {
            return Err(ActionError::Validation(super::errors::FieldErrors::from([(
                "code",
                "Codes may only contain letters, digits and dashes".to_string(),
            )])));
        }
        Some(code) => vec![code],
        None => (0..count.clamp(1, 100)).map(|_| generate_tag_code()).collect(),
    };

    let mut created = Vec::with_capacity(codes.len());
    for code in codes {
        let tag = models::tag::Tag::new_unclaimed(&code, has_nfc);

        repo.insert_tag(&tag).await.map_err(|err| {
            match ActionError::from_store(err) {
                ActionError::Conflict(_) => ActionError::Conflict(format!(
                    "The code {code} already exists, generate a new code"
                )),
                other => other,
            }
        })?;

        metric::incr_tag_action_statds("create");
        created.push(tag);
    }

    Ok(created)
}

/// Deletes an unclaimed tag. The guard runs before any delete is issued and
/// the store re-checks it with a conditional delete.
pub async fn delete_tag(
    tag_id: Uuid,
    confirmed: bool,
    repo: &repo::ImplAppRepo,
) -> Result<models::tag::Tag, ActionError> {
    let tag = repo
        .get_tag_by_id(tag_id)
        .await
        .map_err(ActionError::from_store)?
        .ok_or_else(|| ActionError::NotFound {
            message: "The tag does not exist".into(),
            suggestions: vec![],
        })?;

    if !tag.is_deletable() {
        return Err(ActionError::Conflict(format!(
            "The tag {} is claimed or linked and can't be deleted",
            tag.code
        )));
    }

    if !confirmed {
        return Err(ActionError::NeedsConfirmation);
    }

    let deleted = repo
        .delete_unclaimed_tag(tag_id)
        .await
        .map_err(ActionError::from_store)?;

    if !deleted {
        return Err(ActionError::Conflict(format!(
            "The tag {} changed meanwhile and can't be deleted",
            tag.code
        )));
    }

    metric::incr_tag_action_statds("delete");
    Ok(tag)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublicProfile {
    NotFound { code: String },
    NotActivated { code: String },
    Profile { code: String, pet: models::pet::Pet },
}

/// Public view of a scanned tag
pub async fn get_public_profile(
    raw_code: &str,
    repo: &repo::ImplAppRepo,
) -> Result<PublicProfile, ActionError> {
    let code = normalize_code(raw_code);

    let record = match lookup_tag(&code, repo).await {
        Ok(record) => record,
        Err(ActionError::NotFound { .. } | ActionError::Validation(_)) => {
            return Ok(PublicProfile::NotFound { code });
        }
        Err(err) => return Err(err),
    };

    match record.pet {
        Some(pet) if record.tag.activated => Ok(PublicProfile::Profile {
            code: record.tag.code,
            pet,
        }),
        _ => Ok(PublicProfile::NotActivated {
            code: record.tag.code,
        }),
    }
}

/// Absolute url printed as QR and written on NFC chips. It goes through the
/// activation lookup, so the same url claims an unclaimed tag and shows the
/// public profile of an active one.
pub fn tag_url(base_url: &str, raw_code: &str) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        activation_path(&normalize_code(raw_code))
    )
}

//! Handlers of the /activate url, where printed tags land when scanned

use ntex::web;
use ntex_identity::Identity;
use serde_json::json;

use crate::{
    api::{
        self,
        errors::{ActionError, FieldErrors, Notification},
        tag::ClaimState,
    },
    front::{AppState, forms, middleware, session, utils},
    models,
};

/// Code lookup page, optionally showing why the last lookup failed
fn lookup_page(
    code: &str,
    error: Option<&ActionError>,
    logged_user: Option<&session::WebAppSession>,
    cookie: &ntex_session::Session,
) -> Result<web::HttpResponse, web::Error> {
    let mut context = utils::page_context(
        json!({
            "code": code,
            "field_errors": error.map(|e| e.field_errors()).unwrap_or_default(),
            "suggestions": match error {
                Some(ActionError::NotFound { suggestions, .. }) => suggestions.clone(),
                _ => vec![],
            },
            "rejected": matches!(error, Some(ActionError::AlreadyClaimed)),
        }),
        logged_user,
        cookie,
    );
    if let Some(err) = error.filter(|e| e.field_errors().is_empty()) {
        context.insert("notification", &Notification::from(err));
    }

    utils::render_html("activate.html", &context, "/activate")
}

/// Pet form of a claim (`relink` when the tag lost its pet) or of an edit
fn claim_form_page(
    code: &str,
    editing: bool,
    relink: bool,
    form: &forms::pet::ClaimPetForm,
    field_errors: FieldErrors,
    logged_user: Option<&session::WebAppSession>,
    cookie: &ntex_session::Session,
) -> Result<web::HttpResponse, web::Error> {
    let context = utils::page_context(
        json!({
            "code": code,
            "editing": editing,
            "relink": relink,
            "form": form,
            "field_errors": field_errors,
            "pet_types": models::pet::PetType::ALL.map(|t| t.to_string()),
            "login_url": super::errors::login_redirect(&api::tag::activation_path(code)),
        }),
        logged_user,
        cookie,
    );

    utils::render_html("claim_form.html", &context, "/activate")
}

/// Looks the code up and shows what the visitor can do with the tag
#[web::get("/activate")]
async fn get_activate_view(
    app_state: web::types::State<AppState>,
    logged_user: middleware::logged_user::MaybeLoggedUser,
    query: web::types::Query<forms::tag::LookupQuery>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let logged_user = logged_user.0;
    let Some(raw_code) = query.code.as_deref().filter(|c| !c.trim().is_empty()) else {
        return lookup_page("", None, logged_user.as_ref(), &cookie);
    };

    let record = match api::tag::lookup_tag(raw_code, &app_state.repo).await {
        Ok(record) => record,
        Err(err @ (ActionError::NotFound { .. } | ActionError::Validation(_))) => {
            return lookup_page(raw_code, Some(&err), logged_user.as_ref(), &cookie);
        }
        Err(err) => return Err(err.into()),
    };

    let code = record.tag.code.to_string();
    let state =
        api::tag::resolve_claim_state(&record, logged_user.as_ref().map(|s| &s.user));

    match state {
        ClaimState::Redirect { location } => utils::redirect_to(&location),
        ClaimState::RequireRegistration { redirect_to } => utils::redirect_to(&redirect_to),
        ClaimState::Reject => lookup_page(
            &code,
            Some(&ActionError::AlreadyClaimed),
            logged_user.as_ref(),
            &cookie,
        ),
        ClaimState::Edit { form } => {
            middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;
            claim_form_page(
                &code,
                true,
                false,
                &form,
                FieldErrors::new(),
                logged_user.as_ref(),
                &cookie,
            )
        }
        ClaimState::Claim { relink, form } => {
            middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;
            claim_form_page(
                &code,
                false,
                relink,
                &form,
                FieldErrors::new(),
                logged_user.as_ref(),
                &cookie,
            )
        }
    }
}

/// Saves the pet and links the tag. A partial claim re-renders the form
/// carrying the saved pet id so the next submit only retries the link.
#[web::post("/activate/{code}")]
async fn claim_tag(
    _: middleware::csrf_token::CsrfToken,
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(String,)>,
    form: web::types::Form<forms::pet::ClaimPetForm>,
    identity: Identity,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let code = api::tag::normalize_code(&path.0);
    middleware::logged_user::ensure_live_session(
        &user_session,
        &app_state.auth_service,
        &identity,
        &cookie,
        &api::tag::activation_path(&code),
    )
    .await?;

    let mut form = form.into_inner().sanitized();
    let editing = form.pet_id.is_some();

    match api::tag::commit_claim(&code, &form, &user_session.user, &app_state.repo).await {
        Ok(receipt) => {
            utils::set_notification(
                &cookie,
                &match receipt.created_pet {
                    true => Notification::new(
                        "Tag activated",
                        &format!("The tag {} now shows your pet profile", receipt.code),
                    ),
                    false => Notification::new("Saved", "Your pet profile was updated"),
                },
            );
            utils::redirect_to(&format!("/dashboard/pet/{}", receipt.pet_id))
        }
        Err(ActionError::Validation(field_errors)) => claim_form_page(
            &code,
            editing,
            false,
            &form,
            field_errors,
            Some(&user_session),
            &cookie,
        ),
        Err(err @ ActionError::PartialClaim { pet_id, .. }) => {
            form.pet_id = Some(pet_id);
            utils::set_notification(&cookie, &Notification::from(&err));
            claim_form_page(
                &code,
                editing,
                false,
                &form,
                FieldErrors::new(),
                Some(&user_session),
                &cookie,
            )
        }
        Err(err) => {
            utils::set_notification(&cookie, &Notification::from(&err));
            utils::redirect_to(&api::tag::activation_path(&code))
        }
    }
}

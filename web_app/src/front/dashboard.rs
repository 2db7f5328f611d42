//! Owner pages: the pets list, the owner view of a pet and its removal

use ntex::web;
use ntex_identity::Identity;
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::{self, errors::Notification},
    front::{AppState, forms, middleware, session, utils},
};

#[web::get("")]
async fn get_dashboard_view(
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let pets = api::pet::get_user_dashboard(user_session.user.id, &app_state.repo).await?;

    let context = utils::page_context(
        json!({
            "pets": pets,
        }),
        Some(&user_session),
        &cookie,
    );

    utils::render_html("dashboard.html", &context, "/dashboard")
}

#[web::get("/pet/{pet_id}")]
async fn get_pet_profile_view(
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let pet = api::pet::get_owned_pet(path.0, user_session.user.id, &app_state.repo).await?;

    let tag_urls = pet
        .tags
        .iter()
        .map(|tag| api::tag::tag_url(&app_state.base_url, &tag.code))
        .collect::<Vec<String>>();

    let context = utils::page_context(
        json!({
            "pet": pet.pet,
            "tags": pet.tags,
            "tag_urls": tag_urls,
        }),
        Some(&user_session),
        &cookie,
    );

    utils::render_html("pet_profile.html", &context, "/dashboard/pet")
}

#[web::get("/pet/{pet_id}/delete")]
async fn get_delete_pet_view(
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let pet = api::pet::get_owned_pet(path.0, user_session.user.id, &app_state.repo).await?;
    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;

    let context = utils::page_context(
        json!({
            "pet": pet.pet,
            "tags": pet.tags,
        }),
        Some(&user_session),
        &cookie,
    );

    utils::render_html("confirm_delete.html", &context, "/dashboard/pet/delete")
}

/// Releases the pet tags and deletes it. Without `confirm` nothing is
/// written and the confirmation page is shown again.
#[web::post("/pet/{pet_id}/delete")]
async fn delete_pet(
    _: middleware::csrf_token::CsrfToken,
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
    form: web::types::Form<forms::pet::ConfirmForm>,
    identity: Identity,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let pet_id = path.0;
    middleware::logged_user::ensure_live_session(
        &user_session,
        &app_state.auth_service,
        &identity,
        &cookie,
        &format!("/dashboard/pet/{pet_id}/delete"),
    )
    .await?;

    match api::pet::delete_pet_and_unlink(
        pet_id,
        user_session.user.id,
        form.is_confirmed(),
        &app_state.repo,
    )
    .await
    {
        Ok(pet) => {
            utils::set_notification(
                &cookie,
                &Notification::new(
                    "Pet deleted",
                    &format!("{} was deleted and its tags can be claimed again", pet.name),
                ),
            );
            utils::redirect_to("/dashboard")
        }
        Err(err @ api::errors::ActionError::NeedsConfirmation) => {
            utils::set_notification(&cookie, &Notification::from(&err));
            utils::redirect_to(&format!("/dashboard/pet/{pet_id}/delete"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Activation QR of the pet first tag
#[web::get("/pet/{pet_id}/qr")]
async fn get_pet_qr_code(
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
) -> Result<impl web::Responder, web::Error> {
    let pet = api::pet::get_owned_pet(path.0, user_session.user.id, &app_state.repo).await?;

    let Some(tag) = pet.tags.first() else {
        return Err(api::errors::ActionError::NotFound {
            message: format!("{} has no tag linked yet", pet.pet.name),
            suggestions: vec![],
        }
        .into());
    };

    utils::qr_png_response(&api::tag::tag_url(&app_state.base_url, &tag.code), &tag.code)
}

//! Handlers related to the /info/{code} url

use ntex::web;
use serde_json::json;

use crate::{
    api::{self, tag::PublicProfile},
    front::{AppState, errors, middleware, utils},
};

/// Renders the public profile of the pet linked to `code`. Unknown codes are
/// a 404 and tags without an active pet show how to activate them.
#[web::get("/{code}")]
async fn get_pet_info_view(
    app_state: web::types::State<AppState>,
    logged_user: middleware::logged_user::MaybeLoggedUser,
    path: web::types::Path<(String,)>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    match api::tag::get_public_profile(&path.0, &app_state.repo).await? {
        PublicProfile::NotFound { .. } => Err(errors::UserError::UrlNotFound.into()),
        PublicProfile::NotActivated { code } => {
            let context = utils::page_context(
                json!({
                    "code": code,
                    "activation_path": api::tag::activation_path(&code),
                }),
                logged_user.0.as_ref(),
                &cookie,
            );

            utils::render_html("pet_not_activated.html", &context, "/info")
        }
        PublicProfile::Profile { code, pet } => {
            let is_owner = logged_user
                .0
                .as_ref()
                .is_some_and(|s| s.user.id == pet.user_id);

            let context = utils::page_context(
                json!({
                    "code": code,
                    "pet": pet,
                    "is_owner": is_owner,
                    "contact_is_email": api::validation::is_valid_email(&pet.owner_contact),
                }),
                logged_user.0.as_ref(),
                &cookie,
            );

            utils::render_html("pet_public_info.html", &context, "/info")
        }
    }
}

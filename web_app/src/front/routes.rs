//! Frontend route configuration module.
//!
//! Routes are grouped by functionality into scopes. Owner and admin scopes
//! rely on the session extractors of each handler for access control.

use super::{activate, admin, auth, dashboard, internal_api, pet_public, server};
use ntex::web;

/// Home, help and session routes.
///
/// # Routes
/// - `GET /` - Home with the tag code lookup
/// - `GET /help` - How activation works
/// - `GET|POST /login` - Sign in, keeping `redirect_to`
/// - `GET|POST /register` - Sign up, keeping `redirect_to`
/// - `POST /logout` - Close the session
pub fn site(cfg: &mut web::ServiceConfig) {
    cfg.service((
        server::serve_favicon,
        server::index,
        server::help,
        auth::get_login_view,
        auth::login,
        auth::get_register_view,
        auth::register,
        auth::logout,
    ));
}

/// Tag activation routes, the landing page of every printed QR and NFC chip.
///
/// # Routes
/// - `GET /activate?code=` - Look the tag up and show what the visitor can do
/// - `POST /activate/{code}` - Save the pet and link the tag
pub fn activation(cfg: &mut web::ServiceConfig) {
    cfg.service((activate::get_activate_view, activate::claim_tag));
}

/// Public pet profile routes, no authentication needed.
///
/// # Routes
/// - `GET /info/{code}` - Profile, not activated page or 404
pub fn pet_public_profile(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/info").service((pet_public::get_pet_info_view,)));
}

/// Owner routes.
///
/// # Routes
/// - `GET /dashboard` - Pets and their tags
/// - `GET /dashboard/pet/{pet_id}` - Owner view of a pet
/// - `GET|POST /dashboard/pet/{pet_id}/delete` - Confirm and delete a pet
/// - `GET /dashboard/pet/{pet_id}/qr` - QR PNG of the pet tag
pub fn dashboard(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/dashboard").service((
        dashboard::get_dashboard_view,
        dashboard::get_pet_profile_view,
        dashboard::get_delete_pet_view,
        dashboard::delete_pet,
        dashboard::get_pet_qr_code,
    )));
}

/// Staff routes.
///
/// # Routes
/// - `GET /admin` - Tag, pet, user and NFC statistics
/// - `GET|POST /admin/tags` - List and create tags
/// - `GET|POST /admin/tags/{tag_id}/delete` - Confirm and delete an unclaimed tag
/// - `GET /admin/tags/{code}/qr` - Activation QR PNG
/// - `POST /admin/tags/{code}/nfc` - Mark a tag as NFC
/// - `GET /admin/integrity` - Integrity report
/// - `POST /admin/integrity/fix` - Integrity repair
/// - `GET /admin/users` - User listing
/// - `GET /admin/users/verify?email=` - Single user verification
pub fn admin(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").service((
        admin::get_admin_view,
        admin::get_tags_view,
        admin::create_tags,
        admin::get_delete_tag_view,
        admin::delete_tag,
        admin::get_tag_qr_code,
        admin::mark_tag_nfc,
        admin::get_integrity_view,
        admin::fix_integrity,
        admin::get_users_view,
        admin::verify_user,
    )));
}

/// JSON routes.
///
/// # Routes
/// - `GET /api/tags/lookup?code=` - Tag lookup envelope
/// - `GET /api/tags/{code}/nfc-url` - Url to write on a NFC chip
pub fn json_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tags").service((internal_api::lookup_tag, internal_api::get_nfc_url)),
    );
}

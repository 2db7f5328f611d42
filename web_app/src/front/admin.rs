//! Staff pages under /admin. The [AdminSession] extractor only checks the
//! cookie, every api call below re-reads the role from the store.

use ntex::web;
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::{self, errors::Notification},
    front::{AppState, forms, middleware, middleware::logged_user::AdminSession, utils},
};

#[web::get("")]
async fn get_admin_view(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let overview = api::admin::get_overview(admin.0.user.id, &app_state.repo).await?;

    let context = utils::page_context(
        json!({
            "stats": overview.stats,
            "nfc_stats": overview.nfc_stats,
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/index.html", &context, "/admin")
}

#[web::get("/tags")]
async fn get_tags_view(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let tags = api::admin::list_tags(admin.0.user.id, &app_state.repo).await?;
    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;

    let rows: Vec<_> = tags
        .iter()
        .map(|tag| {
            json!({
                "tag": tag,
                "status": tag.status().to_string(),
                "deletable": tag.is_deletable(),
            })
        })
        .collect();

    let context = utils::page_context(
        json!({
            "tags": rows,
            "suggested_code": api::tag::generate_tag_code(),
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/tags.html", &context, "/admin/tags")
}

/// Creates one tag with the typed code or `count` tags with random codes
#[web::post("/tags")]
async fn create_tags(
    _: middleware::csrf_token::CsrfToken,
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    form: web::types::Form<forms::tag::CreateTagForm>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    api::admin::ensure_admin(admin.0.user.id, &app_state.repo).await?;

    let code = Some(form.code.trim()).filter(|c| !c.is_empty());
    let count = form.count.unwrap_or(1);

    let notification =
        match api::tag::create_tags(code, count, form.wants_nfc(), &app_state.repo).await {
            Ok(created) => Notification::new(
                "Tags created",
                &created
                    .iter()
                    .map(|t| t.code.as_str())
                    .collect::<Vec<&str>>()
                    .join(", "),
            ),
            Err(err) => Notification::from(&err),
        };

    utils::set_notification(&cookie, &notification);
    utils::redirect_to("/admin/tags")
}

#[web::get("/tags/{tag_id}/delete")]
async fn get_delete_tag_view(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let tag = api::admin::get_tag(admin.0.user.id, path.0, &app_state.repo).await?;
    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;

    let context = utils::page_context(
        json!({
            "tag": tag,
            "deletable": tag.is_deletable(),
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/confirm_delete_tag.html", &context, "/admin/tags/delete")
}

#[web::post("/tags/{tag_id}/delete")]
async fn delete_tag(
    _: middleware::csrf_token::CsrfToken,
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(Uuid,)>,
    form: web::types::Form<forms::pet::ConfirmForm>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    api::admin::ensure_admin(admin.0.user.id, &app_state.repo).await?;

    let notification =
        match api::tag::delete_tag(path.0, form.is_confirmed(), &app_state.repo).await {
            Ok(tag) => Notification::new("Tag deleted", &format!("{} was deleted", tag.code)),
            Err(err) => Notification::from(&err),
        };

    utils::set_notification(&cookie, &notification);
    utils::redirect_to("/admin/tags")
}

/// Printable QR pointing to the activation url of `code`
#[web::get("/tags/{code}/qr")]
async fn get_tag_qr_code(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(String,)>,
) -> Result<impl web::Responder, web::Error> {
    api::admin::ensure_admin(admin.0.user.id, &app_state.repo).await?;

    let code = api::tag::normalize_code(&path.0);
    utils::qr_png_response(&api::tag::tag_url(&app_state.base_url, &code), &code)
}

#[web::post("/tags/{code}/nfc")]
async fn mark_tag_nfc(
    _: middleware::csrf_token::CsrfToken,
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    path: web::types::Path<(String,)>,
    form: web::types::Form<forms::tag::MarkNfcForm>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let has_nfc = form.has_nfc.is_some();

    let notification =
        match api::admin::mark_tag_nfc(admin.0.user.id, &path.0, has_nfc, &app_state.repo).await {
            Ok(code) => Notification::new(
                "NFC updated",
                &match has_nfc {
                    true => format!("{code} is marked as NFC"),
                    false => format!("{code} is no longer marked as NFC"),
                },
            ),
            Err(api::errors::ActionError::PermissionDenied) => {
                return Err(api::errors::ActionError::PermissionDenied.into());
            }
            Err(err) => Notification::from(&err),
        };

    utils::set_notification(&cookie, &notification);
    utils::redirect_to("/admin/tags")
}

#[web::get("/integrity")]
async fn get_integrity_view(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let report = api::integrity::scan(admin.0.user.id, &app_state.repo).await?;
    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;

    let context = utils::page_context(
        json!({
            "report": report,
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/integrity.html", &context, "/admin/integrity")
}

#[web::post("/integrity/fix")]
async fn fix_integrity(
    _: middleware::csrf_token::CsrfToken,
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let summary = api::integrity::fix(admin.0.user.id, &app_state.repo).await?;

    utils::set_notification(
        &cookie,
        &match summary.failed {
            0 => Notification::new(
                "Integrity repaired",
                &format!("{} tags fixed", summary.fixed),
            ),
            failed => Notification::new(
                "Integrity partially repaired",
                &format!(
                    "{} tags fixed, {failed} need manual review",
                    summary.fixed
                ),
            ),
        },
    );
    utils::redirect_to("/admin/integrity")
}

#[web::get("/users")]
async fn get_users_view(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let users = api::admin::list_users(admin.0.user.id, &app_state.repo).await?;

    let context = utils::page_context(
        json!({
            "users": users,
            "verification": null,
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/users.html", &context, "/admin/users")
}

/// Single user check; a miss lists similar emails instead of failing
#[web::get("/users/verify")]
async fn verify_user(
    admin: AdminSession,
    app_state: web::types::State<AppState>,
    query: web::types::Query<forms::tag::VerifyUserQuery>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let email = query.email.clone().unwrap_or_default();

    let (verification, suggestions, error) =
        match api::admin::verify_user(admin.0.user.id, &email, &app_state.repo).await {
            Ok(verification) => (Some(verification), vec![], None),
            Err(api::errors::ActionError::PermissionDenied) => {
                return Err(api::errors::ActionError::PermissionDenied.into());
            }
            Err(err) => {
                let suggestions = match &err {
                    api::errors::ActionError::NotFound { suggestions, .. } => suggestions.clone(),
                    _ => vec![],
                };
                (None, suggestions, Some(Notification::from(&err)))
            }
        };

    let context = utils::page_context(
        json!({
            "users": [],
            "email": email,
            "verification": verification,
            "suggestions": suggestions,
            "verify_error": error,
        }),
        Some(&admin.0),
        &cookie,
    );

    utils::render_html("admin/users.html", &context, "/admin/users/verify")
}

//! Sign in, sign up and sign out pages

use ntex::web;
use ntex_identity::Identity;
use serde_json::json;

use crate::{
    api::{self, errors::Notification},
    front::{AppState, forms, middleware, session, utils},
};

const DEFAULT_LANDING: &str = "/dashboard";

fn landing(query: &forms::user::RedirectQuery) -> String {
    utils::safe_redirect_target(query.redirect_to.as_deref())
        .unwrap_or_else(|| DEFAULT_LANDING.into())
}

/// Keeps the signed in user in the identity cookie and sends them on. A new
/// csrf pair is issued for the forms of the signed in pages.
fn remember_and_redirect(
    app_state: &AppState,
    identity: &Identity,
    cookie: &ntex_session::Session,
    signed_in: api::user::SignedIn,
    redirect: &str,
) -> Result<web::HttpResponse, web::Error> {
    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, cookie)?;

    let name = signed_in.user.full_name.clone();
    identity.remember(serde_json::to_string(&session::WebAppSession::from(signed_in))?);

    utils::set_notification(
        cookie,
        &Notification::new("Welcome", &format!("Signed in as {name}")),
    );
    utils::redirect_to(redirect)
}

fn auth_page(
    template_name: &str,
    form: serde_json::Value,
    query: &forms::user::RedirectQuery,
    error: Option<&api::errors::ActionError>,
    cookie: &ntex_session::Session,
) -> Result<web::HttpResponse, web::Error> {
    let mut context = utils::page_context(
        json!({
            "form": form,
            "redirect_to": utils::safe_redirect_target(query.redirect_to.as_deref()),
            "field_errors": error.map(|e| e.field_errors()).unwrap_or_default(),
        }),
        None,
        cookie,
    );
    if let Some(err) = error.filter(|e| e.field_errors().is_empty()) {
        context.insert("notification", &Notification::from(err));
    }

    utils::render_html(template_name, &context, template_name)
}

#[web::get("/login")]
async fn get_login_view(
    app_state: web::types::State<AppState>,
    logged_user: middleware::logged_user::MaybeLoggedUser,
    query: web::types::Query<forms::user::RedirectQuery>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    if logged_user.0.is_some() {
        return utils::redirect_to(&landing(&query));
    }

    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;
    auth_page(
        "login.html",
        json!(forms::user::LoginForm::default()),
        &query,
        None,
        &cookie,
    )
}

#[web::post("/login")]
async fn login(
    _: middleware::csrf_token::CsrfToken,
    app_state: web::types::State<AppState>,
    query: web::types::Query<forms::user::RedirectQuery>,
    form: web::types::Form<forms::user::LoginForm>,
    identity: Identity,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let form = form.into_inner();

    match api::user::sign_in(
        &form,
        &app_state.auth_service,
        &app_state.repo,
        &app_state.session_events,
    )
    .await
    {
        Ok(signed_in) => {
            remember_and_redirect(&app_state, &identity, &cookie, signed_in, &landing(&query))
        }
        Err(err) => auth_page(
            "login.html",
            json!({"email": form.email}),
            &query,
            Some(&err),
            &cookie,
        ),
    }
}

#[web::get("/register")]
async fn get_register_view(
    app_state: web::types::State<AppState>,
    logged_user: middleware::logged_user::MaybeLoggedUser,
    query: web::types::Query<forms::user::RedirectQuery>,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    if logged_user.0.is_some() {
        return utils::redirect_to(&landing(&query));
    }

    middleware::csrf_token::issue_csrf_token(&app_state.csrf_protec, &cookie)?;
    auth_page(
        "register.html",
        json!(forms::user::RegisterForm::default()),
        &query,
        None,
        &cookie,
    )
}

#[web::post("/register")]
async fn register(
    _: middleware::csrf_token::CsrfToken,
    app_state: web::types::State<AppState>,
    query: web::types::Query<forms::user::RedirectQuery>,
    form: web::types::Form<forms::user::RegisterForm>,
    identity: Identity,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let form = form.into_inner();

    match api::user::sign_up(
        &form,
        &app_state.auth_service,
        &app_state.repo,
        &app_state.session_events,
    )
    .await
    {
        Ok(Some(signed_in)) => {
            remember_and_redirect(&app_state, &identity, &cookie, signed_in, &landing(&query))
        }
        Ok(None) => {
            utils::set_notification(
                &cookie,
                &Notification::new(
                    "Confirm your email",
                    "We sent you a link to confirm your account, then sign in",
                ),
            );
            utils::redirect_to(&super::errors::login_redirect(&landing(&query)))
        }
        Err(err) => auth_page(
            "register.html",
            json!({
                "email": form.email,
                "full_name": form.full_name,
                "phone": form.phone,
            }),
            &query,
            Some(&err),
            &cookie,
        ),
    }
}

/// Drops the identity cookie even if the provider can't revoke the token
#[web::post("/logout")]
async fn logout(
    _: middleware::csrf_token::CsrfToken,
    user_session: session::WebAppSession,
    app_state: web::types::State<AppState>,
    identity: Identity,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    if let Err(e) = api::user::sign_out(
        user_session.into(),
        &app_state.auth_service,
        &app_state.session_events,
    )
    .await
    {
        log::warn!("provider sign out failed: {e}");
    }

    identity.forget();
    cookie.clear();

    utils::redirect_to("/")
}

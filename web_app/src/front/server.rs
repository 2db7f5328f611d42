//! Handlers not linked to a specific url

use ntex::web;
use ntex_files::NamedFile;
use serde_json::json;

use crate::front::{errors, middleware, utils};

/// Serve `favicon.ico`
#[web::get("/favicon.ico")]
async fn serve_favicon() -> Result<impl web::Responder, web::Error> {
    Ok(NamedFile::open("web/static/images/favicon.ico")?)
}

/// Return a [UrlNotFound](errors::UserError::UrlNotFound) error for urls not defined
pub async fn serve_not_found() -> Result<web::HttpResponse, web::Error> {
    Err(errors::UserError::UrlNotFound.into())
}

/// Endpoint to render the index view with the tag code lookup
#[web::get("/")]
async fn index(
    logged_user: middleware::logged_user::MaybeLoggedUser,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let context = utils::page_context(json!({}), logged_user.0.as_ref(), &cookie);

    utils::render_html("index.html", &context, "/index")
}

/// How tags are activated and what finders see
#[web::get("/help")]
async fn help(
    logged_user: middleware::logged_user::MaybeLoggedUser,
    cookie: ntex_session::Session,
) -> Result<impl web::Responder, web::Error> {
    let context = utils::page_context(json!({}), logged_user.0.as_ref(), &cookie);

    utils::render_html("help.html", &context, "/help")
}

use fast_qr::{
    ECL,
    convert::{Builder, Shape, image::ImageBuilder},
    qr::QRBuilder,
};
use futures::{future::ok, stream::once};
use ntex::{util::Bytes, web};
use ntex_session::Session;

use crate::{
    api::errors::Notification,
    consts,
    front::{errors, session::WebAppSession},
};

/// [ntext responder](ntex::web::HttpResponse) to redirect to `url`
pub fn redirect_to(url: &str) -> Result<web::HttpResponse, web::Error> {
    Ok(web::HttpResponse::Found()
        .header("location", url)
        .finish())
}

/// Renders `template_name` as a html page. `at` names the endpoint in the
/// error raised when the template fails.
pub fn render_html(
    template_name: &str,
    context: &tera::Context,
    at: &str,
) -> Result<web::HttpResponse, web::Error> {
    let content = super::templates::WEB_TEMPLATES
        .render(template_name, context)
        .map_err(|e| {
            errors::ServerError::TemplateError(format!(
                "at {at} endpoint the template couldnt be rendered: {e}"
            ))
        })?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(content))
}

/// Only relative paths of this site are followed after signing in
pub fn safe_redirect_target(redirect_to: Option<&str>) -> Option<String> {
    redirect_to
        .map(str::trim)
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .filter(|target| !target.contains('\\'))
        .map(str::to_string)
}

/// Stores a toast shown once by the next rendered page
pub fn set_notification(session: &Session, notification: &Notification) {
    if let Err(e) = session.set(consts::NOTIFICATION_COOKIE_NAME, notification) {
        log::warn!("notification couldnt be stored in session: {e}");
    }
}

/// Pops the pending toast, if any
pub fn take_notification(session: &Session) -> Option<Notification> {
    let notification = session
        .get::<Notification>(consts::NOTIFICATION_COOKIE_NAME)
        .ok()
        .flatten();

    if notification.is_some() {
        session.remove(consts::NOTIFICATION_COOKIE_NAME);
    }

    notification
}

/// Context shared by every page: the navbar user and the pending toast
pub fn page_context(
    page: serde_json::Value,
    logged_user: Option<&WebAppSession>,
    session: &Session,
) -> tera::Context {
    let mut context = tera::Context::from_value(page).unwrap_or_default();
    context.insert("logged_user", &logged_user.map(|s| &s.user));
    context.insert("notification", &take_notification(session));
    context
}

pub fn get_qr_code(text: &str) -> anyhow::Result<Vec<u8>> {
    let qr_code = QRBuilder::new(text.as_bytes()).ecl(ECL::H).build()?;

    Ok(ImageBuilder::default()
        .shape(Shape::Square)
        .background_color("#ffffff") //hex value
        .module_color("#000000")
        .fit_width(600)
        .to_bytes(&qr_code)?)
}

/// PNG response with the QR of `text`
pub fn qr_png_response(text: &str, filename: &str) -> Result<web::HttpResponse, web::Error> {
    let qr = get_qr_code(text).map_err(|e| {
        errors::ServerError::InternalServerError(format!("qr code couldnt be generated: {e}"))
    })?;

    Ok(web::HttpResponse::Ok()
        .content_type("image/png")
        .header(
            "content-disposition",
            format!("inline; filename=\"{filename}.png\""),
        )
        .streaming(once(ok::<_, web::Error>(Bytes::from_iter(&qr)))))
}

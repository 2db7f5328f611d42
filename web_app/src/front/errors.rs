use super::templates;
use crate::api::errors::ActionError;
use derive_more::{Display, Error};
use log::error;
use ntex::{http, web};
use serde_json::json;

#[derive(Debug, Display, Error)]
pub enum UserError {
    UrlNotFound,
    /// Carries the path to come back to after signing in
    NeedLogin(#[error(not(source))] String),
    Forbidden,
    FormInputValueError(#[error(not(source))] String),
}

/// Login url that sends the user back to `path`
pub fn login_redirect(path: &str) -> String {
    format!("/login?redirect_to={}", urlencoding::encode(path))
}

impl web::error::WebResponseError for UserError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        if let UserError::NeedLogin(path) = self {
            return web::HttpResponse::Found()
                .header("location", login_redirect(path))
                .finish();
        }

        let mut context = tera::Context::new();
        error!("{:#?}", self);

        let template_name = match self {
            UserError::UrlNotFound => {
                context.insert("msg_details", "resource not found");
                "errors/url_not_found.html"
            }
            UserError::Forbidden => {
                context.insert(
                    "msg_details",
                    "you don't have permission to see this page",
                );
                "errors/forbidden.html"
            }
            UserError::FormInputValueError(msg) => {
                context.insert("msg_details", &format!("form with invalid values: {msg}"));
                "errors/invalid_input_values.html"
            }
            UserError::NeedLogin(_) => "errors/forbidden.html",
        };

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/html; charset=utf-8")
            .body(
                templates::WEB_TEMPLATES
                    .render(template_name, &context)
                    .unwrap_or(self.to_string()),
            )
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            UserError::UrlNotFound => http::StatusCode::NOT_FOUND,
            UserError::NeedLogin(_) => http::StatusCode::FOUND,
            UserError::Forbidden => http::StatusCode::FORBIDDEN,
            UserError::FormInputValueError(_) => http::StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Display, Error)]
pub enum ServerError {
    TemplateError(#[error(not(source))] String),
    ExternalServiceError(#[error(not(source))] String),
    InternalServerError(#[error(not(source))] String),
    InvalidCsrfToken,
}

impl ServerError {
    fn get_error_message(&self) -> String {
        match self {
            ServerError::TemplateError(msg) => format!("[TemplateError] {:#?}", msg),
            ServerError::ExternalServiceError(msg) => format!("[ExternalServiceError] {:#?}", msg),
            ServerError::InternalServerError(msg) => format!("[InternalServerError] {:#?}", msg),
            ServerError::InvalidCsrfToken => "[InvalidCsrfToken]".to_string(),
        }
    }
}

impl web::error::WebResponseError for ServerError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        error!("{}", self.get_error_message());

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/html; charset=utf-8")
            .body(
                templates::WEB_TEMPLATES
                    .render("errors/internal_error.html", &tera::Context::new())
                    .unwrap_or(self.to_string()),
            )
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            ServerError::InvalidCsrfToken => http::StatusCode::FORBIDDEN,
            ServerError::ExternalServiceError(_) => http::StatusCode::BAD_GATEWAY,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Full page fallback for actions that can't be shown inline on a form
impl web::error::WebResponseError for ActionError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        match self {
            ActionError::Transport(_) | ActionError::IntegrityDefect(_) => error!("{self}"),
            _ => log::warn!("{self}"),
        }

        let context = tera::Context::from_value(json!({
            "title": self.title(),
            "msg_details": self.to_string(),
            "suggestions": match self {
                ActionError::NotFound { suggestions, .. } => suggestions.clone(),
                _ => vec![],
            },
            "field_errors": self.field_errors(),
        }))
        .unwrap_or_default();

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/html; charset=utf-8")
            .body(
                templates::WEB_TEMPLATES
                    .render("errors/action_error.html", &context)
                    .unwrap_or(self.to_string()),
            )
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            ActionError::Validation(_) | ActionError::NeedsConfirmation => {
                http::StatusCode::BAD_REQUEST
            }
            ActionError::PermissionDenied => http::StatusCode::FORBIDDEN,
            ActionError::NotFound { .. } => http::StatusCode::NOT_FOUND,
            ActionError::Conflict(_) | ActionError::AlreadyClaimed => http::StatusCode::CONFLICT,
            ActionError::IntegrityDefect(_) | ActionError::PartialClaim { .. } => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            ActionError::Transport(_) => http::StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntex::web::{error::WebResponseError, test::TestRequest};

    #[test]
    fn test_login_redirect_keeps_path() {
        assert_eq!(
            login_redirect("/activate?code=PLK-ABC123"),
            "/login?redirect_to=%2Factivate%3Fcode%3DPLK-ABC123"
        );
    }

    #[ntex::test]
    async fn test_need_login_redirects() {
        let req = TestRequest::default().to_http_request();
        let resp = UserError::NeedLogin("/dashboard".into()).error_response(&req);

        assert_eq!(resp.status(), http::StatusCode::FOUND);
        assert_eq!(
            resp.headers().get("location").unwrap(),
            "/login?redirect_to=%2Fdashboard"
        );
    }

    #[test]
    fn test_action_error_status() {
        assert_eq!(
            ActionError::AlreadyClaimed.status_code(),
            http::StatusCode::CONFLICT
        );
        assert_eq!(
            ActionError::PermissionDenied.status_code(),
            http::StatusCode::FORBIDDEN
        );
        assert_eq!(
            ActionError::Transport("down".into()).status_code(),
            http::StatusCode::BAD_GATEWAY
        );
    }
}

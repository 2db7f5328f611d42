//! Csrf token pair kept in the private session cookie. Pages rendering a form
//! call [issue_csrf_token] and every POST handler takes a [CsrfToken].

use base64::{Engine, prelude::BASE64_STANDARD};
use csrf::{AesGcmCsrfProtection, CsrfProtection};
use ntex::{http::Payload, web};
use ntex_session::{Session, UserSession};

use crate::{
    consts,
    front::{AppState, errors},
};

#[derive(Default, Debug, serde::Serialize, serde::Deserialize)]
pub struct CsrfToken {
    pub token_base64: String,
    pub cookie_base64: String,
}

/// Generates a new pair and stores it in the session
pub fn issue_csrf_token(
    csrf_protec: &AesGcmCsrfProtection,
    session: &Session,
) -> Result<(), web::Error> {
    let (token, cookie) = csrf_protec
        .generate_token_pair(None, consts::MAX_AGE_COOKIES)
        .map_err(|e| {
            errors::ServerError::InternalServerError(format!("cant set token csrf protection: {e}"))
        })?;

    session.set(
        consts::CSRF_TOKEN_COOKIE_NAME,
        serde_json::to_string(&CsrfToken {
            token_base64: token.b64_string(),
            cookie_base64: cookie.b64_string(),
        })?,
    )?;

    Ok(())
}

fn verify_pair(csrf_protec: &AesGcmCsrfProtection, csrf: &CsrfToken) -> bool {
    let token = BASE64_STANDARD
        .decode(csrf.token_base64.as_bytes())
        .map(|token| csrf_protec.parse_token(&token));
    let cookie = BASE64_STANDARD
        .decode(csrf.cookie_base64.as_bytes())
        .map(|cookie| csrf_protec.parse_cookie(&cookie));

    match (token, cookie) {
        (Ok(Ok(token)), Ok(Ok(cookie))) => csrf_protec.verify_token_pair(&token, &cookie).is_ok(),
        _ => false,
    }
}

fn is_csrf_valid(req: &web::HttpRequest) -> bool {
    if let (Ok(Some(csrf)), Some(app_state)) = (
        req.get_session()
            .get::<String>(consts::CSRF_TOKEN_COOKIE_NAME),
        req.app_state::<AppState>(),
    ) {
        let csrf = serde_json::from_str::<CsrfToken>(&csrf).unwrap_or_default();
        return verify_pair(&app_state.csrf_protec, &csrf);
    }

    false
}

impl<Err> web::FromRequest<Err> for CsrfToken {
    type Error = web::Error;

    fn from_request(
        req: &web::HttpRequest,
        _: &mut Payload,
    ) -> impl std::future::Future<Output = Result<Self, Self::Error>> {
        if !is_csrf_valid(req) {
            return std::future::ready(Err(errors::ServerError::InvalidCsrfToken.into()));
        }

        std::future::ready(Ok(Self::default()))
    }
}

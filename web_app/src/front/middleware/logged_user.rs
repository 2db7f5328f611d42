use ntex::{
    http::Payload,
    web::{Error, FromRequest, HttpRequest},
};
use ntex_identity::{Identity, RequestIdentity};

use crate::{
    api,
    front::{errors, session::WebAppSession},
    services,
};

/// Session if the visitor is signed in, `None` for anonymous visitors
pub struct MaybeLoggedUser(pub Option<WebAppSession>);

/// Signed in user whose cookie carries the staff role. Handlers still
/// re-check the role in the store before touching any data.
pub struct AdminSession(pub WebAppSession);

fn deserialize_session(str: &str) -> serde_json::Result<WebAppSession> {
    serde_json::from_str::<WebAppSession>(str)
}

/// Extracts the [WebAppSession] from a string identity cookie
fn get_logged_user(identity_cookie: Option<String>) -> Option<WebAppSession> {
    identity_cookie.and_then(|cookie| deserialize_session(&cookie).ok())
}

/// Path (and query) to come back to after signing in
fn requested_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".into())
}

/// Re-resolves the provider token before a state changing action. A dead
/// token drops the identity and sends the visitor to sign in, coming back
/// to `return_to` afterwards.
pub async fn ensure_live_session(
    session: &WebAppSession,
    auth_service: &services::ImplAuthService,
    identity: &Identity,
    cookie: &ntex_session::Session,
    return_to: &str,
) -> Result<(), Error> {
    if api::user::is_session_live(session.user.id, &session.access_token, auth_service).await? {
        return Ok(());
    }

    log::info!("dropping expired session of user {}", session.user.id);
    identity.forget();
    cookie.clear();

    Err(errors::UserError::NeedLogin(return_to.to_string()).into())
}

impl<Err> FromRequest<Err> for WebAppSession {
    type Error = Error;

    fn from_request(
        req: &HttpRequest,
        _: &mut Payload,
    ) -> impl std::future::Future<Output = Result<Self, Self::Error>> {
        let result: Result<Self, Error> = get_logged_user(req.get_identity())
            .ok_or_else(|| errors::UserError::NeedLogin(requested_path(req)).into());

        futures::future::ready(result)
    }
}

impl<Err> FromRequest<Err> for MaybeLoggedUser {
    type Error = Error;

    fn from_request(
        req: &HttpRequest,
        _: &mut Payload,
    ) -> impl std::future::Future<Output = Result<Self, Self::Error>> {
        futures::future::ready(Ok(Self(get_logged_user(req.get_identity()))))
    }
}

impl<Err> FromRequest<Err> for AdminSession {
    type Error = Error;

    fn from_request(
        req: &HttpRequest,
        _: &mut Payload,
    ) -> impl std::future::Future<Output = Result<Self, Self::Error>> {
        let result: Result<Self, Error> = match get_logged_user(req.get_identity()) {
            Some(session) if session.is_admin() => Ok(Self(session)),
            Some(_) => Err(errors::UserError::Forbidden.into()),
            None => Err(errors::UserError::NeedLogin(requested_path(req)).into()),
        };

        futures::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models, repo::sqlite::tests::test_user};

    #[test]
    fn test_get_logged_user_from_cookie() {
        let session = WebAppSession {
            user: test_user("ana@correo.mx"),
            access_token: "token".into(),
        };
        let cookie = serde_json::to_string(&session).unwrap();

        assert_eq!(get_logged_user(Some(cookie)), Some(session));
        assert_eq!(get_logged_user(Some("not json".into())), None);
        assert_eq!(get_logged_user(None), None);
    }

    #[test]
    fn test_staff_cookie_is_admin() {
        let session = WebAppSession {
            user: models::user_app::User {
                account_role: models::user_app::AccountRole::Staff,
                ..test_user("staff@plakita.app")
            },
            access_token: "token".into(),
        };

        assert!(session.is_admin());
    }
}

use crate::{api, models};

/// Cookie session data stored (encrypt) on user side
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct WebAppSession {
    pub user: models::user_app::User,
    pub access_token: String,
}

impl WebAppSession {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

impl From<api::user::SignedIn> for WebAppSession {
    fn from(signed_in: api::user::SignedIn) -> Self {
        Self {
            user: signed_in.user,
            access_token: signed_in.access_token,
        }
    }
}

impl From<WebAppSession> for api::user::SignedIn {
    fn from(session: WebAppSession) -> Self {
        Self {
            user: session.user,
            access_token: session.access_token,
        }
    }
}

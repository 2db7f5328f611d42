pub mod local_auth;
pub mod supabase_auth;

use crate::{metric, models};
use async_trait::async_trait;
use derive_more::{Display, Error};
use tokio::sync::broadcast;

/// Failures of the auth provider the pages react to
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum AuthError {
    #[display("invalid email or password")]
    InvalidCredentials,
    #[display("email already registered")]
    EmailTaken,
    #[display("auth request failed: {_0}")]
    Transport(#[error(not(source))] String),
}

/// Email/password authentication provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolves the user owning `access_token`, None when it expired or was revoked
    async fn get_session(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<models::user_app::AuthUser>>;

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<models::user_app::AuthSession>;

    /// None when the provider asks the user to confirm the email first
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &models::user_app::SignUpProfile,
    ) -> anyhow::Result<Option<models::user_app::AuthSession>>;

    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()>;
}

pub type ImplAuthService = Box<dyn AuthService>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    #[display("signed_in")]
    SignedIn,
    #[display("signed_up")]
    SignedUp,
    #[display("signed_out")]
    SignedOut,
}

pub type SessionMessage = (SessionEvent, Option<models::user_app::User>);

/// Fan-out of session changes to whoever subscribed
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionMessage>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishing without subscribers is not an error
    pub fn publish(&self, event: SessionEvent, user: Option<models::user_app::User>) {
        let _ = self.sender.send((event, user));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionMessage> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Logs and counts session changes until every sender is dropped
pub async fn listen_session_events(mut receiver: broadcast::Receiver<SessionMessage>) {
    loop {
        match receiver.recv().await {
            Ok((event, user)) => {
                logfire::info!(
                    "session event {event} user={user}",
                    event = event.to_string(),
                    user = user.map(|u| u.id.to_string()).unwrap_or_default()
                );
                metric::incr_user_action_statds(&event.to_string());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                logfire::warn!("session listener lagged, skipped={skipped}", skipped = skipped as i64);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> models::user_app::User {
        models::user_app::User {
            id: Uuid::new_v4(),
            email: "ana@plakita.app".into(),
            full_name: "Ana".into(),
            phone: None,
            account_role: models::user_app::AccountRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[ntex::test]
    async fn test_subscribers_receive_events_in_order() {
        let events = SessionEvents::default();
        let mut receiver = events.subscribe();
        let user = user();

        events.publish(SessionEvent::SignedIn, Some(user.clone()));
        events.publish(SessionEvent::SignedOut, None);

        assert_eq!(
            receiver.recv().await.unwrap(),
            (SessionEvent::SignedIn, Some(user))
        );
        assert_eq!(receiver.recv().await.unwrap(), (SessionEvent::SignedOut, None));
    }

    #[ntex::test]
    async fn test_publish_without_subscribers_is_silent() {
        let events = SessionEvents::new(2);
        events.publish(SessionEvent::SignedUp, None);
    }

    #[ntex::test]
    async fn test_listener_stops_when_senders_dropped() {
        let events = SessionEvents::new(4);
        let receiver = events.subscribe();
        drop(events);

        listen_session_events(receiver).await;
    }

    #[ntex::test]
    async fn test_listener_survives_lagging_behind() {
        let events = SessionEvents::new(1);
        let receiver = events.subscribe();
        events.publish(SessionEvent::SignedIn, Some(user()));
        events.publish(SessionEvent::SignedOut, None);
        events.publish(SessionEvent::SignedUp, None);
        drop(events);

        listen_session_events(receiver).await;
    }
}

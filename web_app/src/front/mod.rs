pub mod activate;
pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod errors;
pub mod forms;
pub mod internal_api;
pub mod middleware;
pub mod pet_public;
pub mod routes;
pub mod server;
pub mod session;
pub mod templates;
pub mod utils;

use crate::{repo, services};
use csrf::AesGcmCsrfProtection;

pub struct AppState {
    pub csrf_protec: AesGcmCsrfProtection,
    pub repo: repo::ImplAppRepo,
    pub auth_service: services::ImplAuthService,
    pub session_events: services::SessionEvents,
    /// Absolute url printed on QR codes and NFC chips
    pub base_url: String,
}

//! JSON endpoints used by the browser NFC writer and QR scanners.
//!
//! Every response is an [ActionResult] envelope `{success, data, error}` and
//! only carries what the public profile already shows.

use crate::{
    api::{
        self,
        errors::{ActionError, ActionResult},
    },
    front::{AppState, forms},
    models,
};
use ntex::web;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct TagLookupData {
    pub code: String,
    pub activated: bool,
    pub has_nfc: bool,
    /// Page the scanner should open next
    pub location: String,
}

impl From<&models::tag::TagRecord> for TagLookupData {
    fn from(record: &models::tag::TagRecord) -> Self {
        let has_profile = record.tag.activated && record.pet.is_some();

        Self {
            code: record.tag.code.to_string(),
            activated: record.tag.activated,
            has_nfc: record.tag.has_nfc,
            location: match has_profile {
                true => api::tag::public_profile_path(&record.tag.code),
                false => api::tag::activation_path(&record.tag.code),
            },
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NfcUrlData {
    pub code: String,
    pub url: String,
}

fn json_response<T: Serialize>(result: Result<T, ActionError>) -> web::HttpResponse {
    let status = match &result {
        Ok(_) => ntex::http::StatusCode::OK,
        Err(err) => {
            let status = web::error::WebResponseError::status_code(err);
            if status.is_server_error() {
                tracing::error!("json api action failed: {}", err);
            }
            status
        }
    };

    web::HttpResponse::build(status).json(&ActionResult::from(result))
}

#[web::get("/lookup")]
pub async fn lookup_tag(
    app_state: web::types::State<AppState>,
    query: web::types::Query<forms::tag::LookupQuery>,
) -> impl web::Responder {
    let raw_code = query.code.clone().unwrap_or_default();

    json_response(
        api::tag::lookup_tag(&raw_code, &app_state.repo)
            .await
            .map(|record| TagLookupData::from(&record)),
    )
}

/// Url to write on the NFC chip of an existing tag
#[web::get("/{code}/nfc-url")]
pub async fn get_nfc_url(
    app_state: web::types::State<AppState>,
    path: web::types::Path<(String,)>,
) -> impl web::Responder {
    json_response(
        api::tag::lookup_tag(&path.0, &app_state.repo)
            .await
            .map(|record| NfcUrlData {
                url: api::tag::tag_url(&app_state.base_url, &record.tag.code),
                code: record.tag.code,
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::sqlite::tests::test_pet;
    use uuid::Uuid;

    #[test]
    fn test_lookup_data_points_to_next_page() {
        let unclaimed = models::tag::TagRecord {
            tag: models::tag::Tag::new_unclaimed("PLK-ABC123", true),
            pet: None,
        };
        assert_eq!(
            TagLookupData::from(&unclaimed),
            TagLookupData {
                code: "PLK-ABC123".into(),
                activated: false,
                has_nfc: true,
                location: "/activate?code=PLK-ABC123".into(),
            }
        );

        let owner = Uuid::new_v4();
        let pet = test_pet(owner);
        let active = models::tag::TagRecord {
            tag: models::tag::Tag {
                activated: true,
                pet_id: Some(pet.id),
                user_id: Some(owner),
                ..models::tag::Tag::new_unclaimed("PLK-ABC123", false)
            },
            pet: Some(pet),
        };
        assert_eq!(TagLookupData::from(&active).location, "/info/PLK-ABC123");
    }
}

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::tag::Tag;

#[derive(Debug, Display, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum PetType {
    #[default]
    #[display("dog")]
    #[serde(rename = "dog")]
    Dog,
    #[display("cat")]
    #[serde(rename = "cat")]
    Cat,
    #[display("bird")]
    #[serde(rename = "bird")]
    Bird,
    #[display("rabbit")]
    #[serde(rename = "rabbit")]
    Rabbit,
    #[display("other")]
    #[serde(rename = "other")]
    Other,
}

impl PetType {
    pub const ALL: [PetType; 5] = [
        PetType::Dog,
        PetType::Cat,
        PetType::Bird,
        PetType::Rabbit,
        PetType::Other,
    ];
}

impl FromStr for PetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PetType::ALL
            .into_iter()
            .find(|t| t.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("unknown pet type: {s}"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    #[serde(default)]
    pub breed: String,
    pub owner_name: String,
    #[serde(default)]
    pub owner_contact: String,
    #[serde(default)]
    pub owner_phone: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub qr_activated: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pet as listed on the owner dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PetWithTags {
    #[serde(flatten)]
    pub pet: Pet,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::Entity;

/// A published event is visible in the directory once `is_public` is set,
/// `status` is "published" and `start_at` is in the future. Events are
/// managed elsewhere; this codebase only queries and renders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: ObjectId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub start_at: i64,
    pub end_at: Option<i64>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub geo_lat: Option<f64>,
    pub geo_lng: Option<f64>,
    pub cover_image_url: Option<String>,
    pub host_id: Option<ObjectId>,
    pub is_public: bool,
    pub status: String,
    pub tags: Vec<String>,
    pub price_model: Option<String>,
    pub ticket_link: Option<String>,
    pub created_at: i64,
}

impl Entity for Event {
    fn id(&self) -> ObjectId {
        self.id
    }
}

pub const STATUS_PUBLISHED: &str = "published";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HostPreview {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicEvent {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub start_at: i64,
    pub end_at: Option<i64>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub geo_lat: Option<f64>,
    pub geo_lng: Option<f64>,
    pub cover_image_url: Option<String>,
    pub tags: Vec<String>,
    pub price_model: Option<String>,
    pub ticket_link: Option<String>,
    pub host: Option<HostPreview>,
}

impl Event {
    pub fn publish(self, host: Option<HostPreview>) -> PublicEvent {
        PublicEvent {
            id: self.id.to_hex(),
            title: self.title,
            slug: self.slug,
            description: self.description,
            start_at: self.start_at,
            end_at: self.end_at,
            location_name: self.location_name,
            address: self.address,
            geo_lat: self.geo_lat,
            geo_lng: self.geo_lng,
            cover_image_url: self.cover_image_url,
            tags: self.tags,
            price_model: self.price_model,
            ticket_link: self.ticket_link,
            host,
        }
    }

    /// City component of the address: the last comma-separated part.
    pub fn city(&self) -> Option<String> {
        let address = self.address.as_deref()?;
        address
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .last()
            .map(str::to_string)
    }
}

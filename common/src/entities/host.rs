use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::Entity;

/// An organizer profile associated with zero or more events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: ObjectId,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub social_links: HashMap<String, String>,
    pub created_at: i64,
}

impl Entity for Host {
    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicHost {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub social_links: HashMap<String, String>,
}

impl From<Host> for PublicHost {
    fn from(host: Host) -> Self {
        Self {
            id: host.id.to_hex(),
            name: host.name,
            slug: host.slug,
            description: host.description,
            website_url: host.website_url,
            social_links: host.social_links,
        }
    }
}

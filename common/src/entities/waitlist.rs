use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

/// A pending or confirmed waitlist registration. The email is the identity
/// key: a duplicate submission must never create a second entry. The token
/// is a one-time credential proving email ownership; it stops being
/// consumable once `confirmed` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: ObjectId,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub city: Option<String>,
    pub confirmed: bool,
    pub confirmation_token: String,
    pub confirmed_at: Option<i64>,
    pub created_at: i64,
}

impl Entity for WaitlistEntry {
    fn id(&self) -> ObjectId {
        self.id
    }
}

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

/// Server-side record behind the opaque refresh cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: ObjectId,
    pub token: String,
    pub user_id: ObjectId,
    pub created_at: i64,
}

impl Entity for Session {
    fn id(&self) -> ObjectId {
        self.id
    }
}

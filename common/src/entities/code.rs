use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

/// One-time password reset code, consumed on use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    pub id: ObjectId,
    pub code: String,
    pub email: String,
    pub created_at: i64,
}

impl Entity for Code {
    fn id(&self) -> ObjectId {
        self.id
    }
}

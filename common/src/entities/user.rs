use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: ObjectId,
    pub email: String,
    pub password: String,
    pub salt: String,
    pub name: String,
    pub created_at: i64,
}

impl Entity for User {
    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: i64,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

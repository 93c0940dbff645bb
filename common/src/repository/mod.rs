pub mod mongo_repository;
pub mod test_repository;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson};

use crate::error;

pub trait Entity {
    fn id(&self) -> ObjectId;
}

#[async_trait]
pub trait Repository<T> {
    /// Inserts the item unless a row with the same id already exists.
    /// Returns whether the item was actually inserted.
    async fn insert(&self, item: &T) -> error::Result<bool>;
    /// Atomic conditional insert keyed on `field`: stores the item unless a
    /// row with the same field value exists, in which case that row is
    /// returned and nothing is written. Safe under concurrent callers.
    async fn insert_unique(&self, field: &str, value: &Bson, item: &T)
        -> error::Result<Option<T>>;
    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>>;
    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>>;
    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>>;
    async fn delete(&self, field: &str, value: &Bson) -> error::Result<Option<T>>;
}

/// Extension for entities with a one-time confirmation token
/// (`confirmation_token` + `confirmed` + `confirmed_at` fields).
#[async_trait]
pub trait ConfirmableEntityRepository<T>: Repository<T> {
    /// Atomic conditional update: flips `confirmed` to true for the row
    /// matching the token, but only while it is still unconfirmed. Returns
    /// the updated row, or None when the token is unknown or already spent.
    async fn confirm_by_token(&self, token: &str, at: i64) -> error::Result<Option<T>>;
}

pub type RepositoryObject<T> = Arc<dyn Repository<T> + Send + Sync>;
pub type ConfirmableRepositoryObject<T> = Arc<dyn ConfirmableEntityRepository<T> + Send + Sync>;

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::IndexModel;
use serde::{de::DeserializeOwned, Serialize};

use crate::error;

use super::{ConfirmableEntityRepository, Entity, Repository};

pub struct MongoRepository<T> {
    pub collection: mongodb::Collection<T>,
}

impl<T> MongoRepository<T> {
    pub async fn new(mongo_uri: &str, database: &str, collection: &str) -> Self {
        let collection = mongodb::Client::with_uri_str(mongo_uri)
            .await
            .unwrap()
            .database(database)
            .collection(collection);
        Self { collection }
    }

    /// Backs `insert_unique`: without the index, concurrent upserts on the
    /// same missing key can both insert.
    pub async fn ensure_unique_index(&self, field: &str) {
        let index = IndexModel::builder()
            .keys(doc! {field: 1})
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index, None).await.unwrap();
    }
}

#[async_trait]
impl<T> Repository<T> for MongoRepository<T>
where
    T: Entity + Serialize + DeserializeOwned + Unpin + Clone + Send + Sync,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let absent = self
            .collection
            .find_one(doc! {"id": item.id()}, None)
            .await?
            .is_none();

        if absent {
            self.collection.insert_one(item, None).await?;
        }
        Ok(absent)
    }

    async fn insert_unique(
        &self,
        field: &str,
        value: &Bson,
        item: &T,
    ) -> error::Result<Option<T>> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .build();

        // Single round trip: matches the existing row, or inserts the item
        // when there is none. Before-image None means the item was inserted.
        let existing = self
            .collection
            .find_one_and_update(
                doc! {field: value},
                doc! {"$setOnInsert": bson::to_document(item)?},
                options,
            )
            .await?;

        Ok(existing)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let result = self.collection.find_one(doc! {field: value}, None).await?;
        Ok(result)
    }

    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>> {
        let result: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(doc! {field: value}, None)
            .await?
            .collect()
            .await;
        Ok(result.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>> {
        let find_options = FindOptions::builder()
            .skip(skip as u64)
            .limit(limit as i64)
            .build();

        let results: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(None, find_options)
            .await?
            .collect()
            .await;

        Ok(results.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn delete(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let result = self
            .collection
            .find_one_and_delete(doc! {field: value}, None)
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl<T> ConfirmableEntityRepository<T> for MongoRepository<T>
where
    T: Entity + Serialize + DeserializeOwned + Unpin + Clone + Send + Sync,
{
    async fn confirm_by_token(&self, token: &str, at: i64) -> error::Result<Option<T>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection
            .find_one_and_update(
                doc! {"confirmation_token": token, "confirmed": false},
                doc! {"$set": {"confirmed": true, "confirmed_at": Bson::Int64(at)}},
                options,
            )
            .await?;

        Ok(result)
    }
}

use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{self, Bson};
use serde::{de::DeserializeOwned, Serialize};

use crate::error;

use super::{ConfirmableEntityRepository, Entity, Repository};

/// In-memory stand-in for MongoRepository, used by create_test_app.
pub struct TestRepository<T> {
    _t: std::marker::PhantomData<T>,
    pub db: Mutex<Vec<Bson>>,
}

impl<T> TestRepository<T> {
    pub fn new() -> Self {
        Self {
            _t: std::marker::PhantomData,
            db: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Default for TestRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Repository<T> for TestRepository<T>
where
    T: Entity + Clone + Send + Sync + Serialize + DeserializeOwned,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let mut db = self.db.lock().unwrap();

        let contains = db
            .iter()
            .any(|x| x.as_document().unwrap().get_object_id("id").unwrap() == item.id());
        if !contains {
            db.push(bson::to_bson(&item).unwrap());
        }
        Ok(!contains)
    }

    async fn insert_unique(
        &self,
        field: &str,
        value: &Bson,
        item: &T,
    ) -> error::Result<Option<T>> {
        // Check and insert under one lock, like the single Mongo upsert.
        let mut db = self.db.lock().unwrap();

        let existing = db
            .iter()
            .find(|x| x.as_document().unwrap().get(field) == Some(value))
            .cloned();
        if let Some(existing) = existing {
            return Ok(Some(bson::from_bson(existing).unwrap()));
        }

        db.push(bson::to_bson(&item).unwrap());
        Ok(None)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .iter()
            .find(|x| x.as_document().unwrap().get(field) == Some(value))
            .cloned()
            .map(|x| bson::from_bson(x).unwrap()))
    }

    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .iter()
            .filter(|x| x.as_document().unwrap().get(field) == Some(value))
            .map(|x| bson::from_bson(x.clone()).unwrap())
            .collect())
    }

    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|x| bson::from_bson(x.clone()).unwrap())
            .collect())
    }

    async fn delete(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let mut db = self.db.lock().unwrap();
        let pos = db
            .iter()
            .position(|x| x.as_document().unwrap().get(field) == Some(value));

        Ok(pos.map(|pos| bson::from_bson(db.remove(pos)).unwrap()))
    }
}

#[async_trait]
impl<T> ConfirmableEntityRepository<T> for TestRepository<T>
where
    T: Entity + Clone + Send + Sync + Serialize + DeserializeOwned,
{
    async fn confirm_by_token(&self, token: &str, at: i64) -> error::Result<Option<T>> {
        let mut db = self.db.lock().unwrap();

        let Some(doc) = db.iter_mut().find_map(|x| {
            let doc = x.as_document_mut().unwrap();
            let matches = doc.get_str("confirmation_token") == Ok(token)
                && doc.get_bool("confirmed") == Ok(false);
            matches.then_some(doc)
        }) else {
            return Ok(None);
        };

        doc.insert("confirmed", Bson::Boolean(true));
        doc.insert("confirmed_at", Bson::Int64(at));

        Ok(Some(bson::from_bson(Bson::Document(doc.clone())).unwrap()))
    }
}

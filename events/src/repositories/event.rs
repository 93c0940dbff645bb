use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::FindOptions;

use common::entities::event::{Event, STATUS_PUBLISHED};
use common::error;

/// Filters shared by the paginated list, the map feed and the facet
/// queries. Every read in this crate goes through it: only public,
/// published, future-dated events are ever served.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub tag: Option<String>,
    pub city: Option<String>,
    pub query: Option<String>,
    pub starting_after: i64,
    pub with_coords: bool,
}

#[async_trait]
pub trait EventsRepository {
    async fn find_upcoming(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: Option<u32>,
    ) -> error::Result<Vec<Event>>;
    async fn find_by_slug(&self, slug: &str) -> error::Result<Option<Event>>;
    async fn find_by_host(
        &self,
        host_id: ObjectId,
        starting_after: i64,
    ) -> error::Result<Vec<Event>>;
}

pub type EventsRepositoryObject = Arc<dyn EventsRepository + Send + Sync>;

pub struct MongoEventsRepository {
    pub collection: mongodb::Collection<Event>,
}

impl MongoEventsRepository {
    pub async fn new(mongo_uri: &str, database: &str, collection: &str) -> Self {
        let collection = mongodb::Client::with_uri_str(mongo_uri)
            .await
            .unwrap()
            .database(database)
            .collection(collection);
        Self { collection }
    }

    fn filter_document(filter: &EventFilter) -> Document {
        let mut document = doc! {
            "is_public": true,
            "status": STATUS_PUBLISHED,
            "start_at": {"$gte": filter.starting_after},
        };

        if let Some(tag) = &filter.tag {
            document.insert("tags", tag.clone());
        }
        if let Some(city) = &filter.city {
            document.insert(
                "address",
                doc! {"$regex": regex::escape(city), "$options": "i"},
            );
        }
        if let Some(query) = &filter.query {
            document.insert(
                "title",
                doc! {"$regex": regex::escape(query), "$options": "i"},
            );
        }
        if filter.with_coords {
            document.insert("geo_lat", doc! {"$ne": Bson::Null});
            document.insert("geo_lng", doc! {"$ne": Bson::Null});
        }

        document
    }
}

#[async_trait]
impl EventsRepository for MongoEventsRepository {
    async fn find_upcoming(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: Option<u32>,
    ) -> error::Result<Vec<Event>> {
        let find_options = FindOptions::builder()
            .sort(doc! {"start_at": 1})
            .skip(skip)
            .limit(limit.map(|limit| limit as i64))
            .build();

        let results: Vec<mongodb::error::Result<Event>> = self
            .collection
            .find(Self::filter_document(filter), find_options)
            .await?
            .collect()
            .await;

        Ok(results.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn find_by_slug(&self, slug: &str) -> error::Result<Option<Event>> {
        let result = self
            .collection
            .find_one(
                doc! {"slug": slug, "is_public": true, "status": STATUS_PUBLISHED},
                None,
            )
            .await?;
        Ok(result)
    }

    async fn find_by_host(
        &self,
        host_id: ObjectId,
        starting_after: i64,
    ) -> error::Result<Vec<Event>> {
        let find_options = FindOptions::builder().sort(doc! {"start_at": 1}).build();

        let results: Vec<mongodb::error::Result<Event>> = self
            .collection
            .find(
                doc! {
                    "host_id": host_id,
                    "is_public": true,
                    "status": STATUS_PUBLISHED,
                    "start_at": {"$gte": starting_after},
                },
                find_options,
            )
            .await?
            .collect()
            .await;

        Ok(results.into_iter().collect::<mongodb::error::Result<_>>()?)
    }
}

/// In-memory variant backing create_test_app.
pub struct TestEventsRepository {
    pub db: Mutex<Vec<Event>>,
}

impl TestEventsRepository {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            db: Mutex::new(events),
        }
    }

    fn matches(filter: &EventFilter, event: &Event) -> bool {
        if !event.is_public
            || event.status != STATUS_PUBLISHED
            || event.start_at < filter.starting_after
        {
            return false;
        }
        if let Some(tag) = &filter.tag {
            if !event.tags.contains(tag) {
                return false;
            }
        }
        if let Some(city) = &filter.city {
            let address = event.address.as_deref().unwrap_or_default().to_lowercase();
            if !address.contains(&city.to_lowercase()) {
                return false;
            }
        }
        if let Some(query) = &filter.query {
            if !event.title.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }
        if filter.with_coords && (event.geo_lat.is_none() || event.geo_lng.is_none()) {
            return false;
        }
        true
    }
}

#[async_trait]
impl EventsRepository for TestEventsRepository {
    async fn find_upcoming(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: Option<u32>,
    ) -> error::Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let mut events: Vec<Event> = db
            .iter()
            .filter(|event| Self::matches(filter, event))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start_at);

        Ok(events
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit.map(|limit| limit as usize).unwrap_or(usize::MAX))
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> error::Result<Option<Event>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .iter()
            .find(|event| {
                event.slug == slug && event.is_public && event.status == STATUS_PUBLISHED
            })
            .cloned())
    }

    async fn find_by_host(
        &self,
        host_id: ObjectId,
        starting_after: i64,
    ) -> error::Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let mut events: Vec<Event> = db
            .iter()
            .filter(|event| {
                event.host_id == Some(host_id)
                    && event.is_public
                    && event.status == STATUS_PUBLISHED
                    && event.start_at >= starting_after
            })
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start_at);
        Ok(events)
    }
}

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::{
    context::Context,
    default_timestamp,
    entities::{
        event::{Event, HostPreview, PublicEvent},
        host::Host,
    },
    error::{self, AddCode},
    repository::Repository,
};

use crate::repositories::event::{EventFilter, EventsRepository, EventsRepositoryObject};
use crate::service::geo::haversine_km;
use crate::service::ics::generate_ics;

pub const PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListQuery {
    pub tag: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventListResponse {
    pub data: Vec<PublicEvent>,
    pub page: u32,
    pub limit: u32,
}

pub struct EventService {
    context: Context,
}

impl EventService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn repository(&self) -> error::Result<EventsRepositoryObject> {
        self.context
            .try_get_repository_manual::<EventsRepositoryObject>()
    }

    fn filter(query: &EventListQuery, with_coords: bool) -> EventFilter {
        EventFilter {
            tag: normalize(query.tag.clone()),
            city: normalize(query.city.clone()),
            query: normalize(query.q.clone()),
            starting_after: default_timestamp(),
            with_coords,
        }
    }

    /// Distance filter applied in memory after the query; coordinates are
    /// too sparse to justify a geo index.
    fn apply_distance(events: Vec<Event>, query: &EventListQuery) -> Vec<Event> {
        let (Some(lat), Some(lng), Some(radius_km)) = (query.lat, query.lng, query.radius_km)
        else {
            return events;
        };

        events
            .into_iter()
            .filter(|event| match (event.geo_lat, event.geo_lng) {
                (Some(event_lat), Some(event_lng)) => {
                    haversine_km(lat, lng, event_lat, event_lng) <= radius_km
                }
                _ => false,
            })
            .collect()
    }

    async fn publish_all(&self, events: Vec<Event>) -> error::Result<Vec<PublicEvent>> {
        let hosts = self.context.try_get_repository::<Host>()?;

        let mut published = Vec::with_capacity(events.len());
        for event in events {
            let preview = match event.host_id {
                Some(host_id) => hosts
                    .find("id", &Bson::ObjectId(host_id))
                    .await?
                    .map(|host| HostPreview {
                        name: host.name,
                        slug: host.slug,
                    }),
                None => None,
            };
            published.push(event.publish(preview));
        }
        Ok(published)
    }

    pub async fn list(&self, query: EventListQuery) -> error::Result<EventListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        // Widened before multiplying: both factors are caller-controlled.
        let skip = (page as u64 - 1) * limit as u64;

        let events = self
            .repository()?
            .find_upcoming(&Self::filter(&query, false), skip, Some(limit))
            .await?;
        let events = Self::apply_distance(events, &query);

        Ok(EventListResponse {
            data: self.publish_all(events).await?,
            page,
            limit,
        })
    }

    /// Companion feed for the map view: same filters, no pagination, only
    /// events that can actually be placed on the map.
    pub async fn map(&self, query: EventListQuery) -> error::Result<Vec<PublicEvent>> {
        let events = self
            .repository()?
            .find_upcoming(&Self::filter(&query, true), 0, None)
            .await?;
        let events = Self::apply_distance(events, &query);

        self.publish_all(events).await
    }

    pub async fn tags(&self) -> error::Result<Vec<String>> {
        let events = self
            .repository()?
            .find_upcoming(&EventFilter::upcoming(), 0, None)
            .await?;

        let tags: std::collections::BTreeSet<String> = events
            .into_iter()
            .flat_map(|event| event.tags)
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(tags.into_iter().collect())
    }

    pub async fn cities(&self) -> error::Result<Vec<String>> {
        let events = self
            .repository()?
            .find_upcoming(&EventFilter::upcoming(), 0, None)
            .await?;

        let cities: std::collections::BTreeSet<String> =
            events.iter().filter_map(Event::city).collect();

        Ok(cities.into_iter().collect())
    }

    pub async fn find_by_slug(&self, slug: &str) -> error::Result<PublicEvent> {
        let event = self.raw_by_slug(slug).await?;
        let mut published = self.publish_all(vec![event]).await?;
        Ok(published.remove(0))
    }

    pub async fn calendar(&self, slug: &str) -> error::Result<(String, String)> {
        let event = self.raw_by_slug(slug).await?;
        let filename = format!("{}.ics", event.slug);
        Ok((filename, generate_ics(&event)?))
    }

    async fn raw_by_slug(&self, slug: &str) -> error::Result<Event> {
        self.repository()?
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No event found").code(404))
    }
}

impl EventFilter {
    fn upcoming() -> Self {
        Self {
            starting_after: default_timestamp(),
            ..Self::default()
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

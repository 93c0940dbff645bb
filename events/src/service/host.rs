use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::{
    context::Context,
    default_timestamp,
    entities::{
        event::{HostPreview, PublicEvent},
        host::{Host, PublicHost},
    },
    error::{self, AddCode},
    repository::Repository,
};

use crate::repositories::event::{EventsRepository, EventsRepositoryObject};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HostPage {
    pub host: PublicHost,
    pub events: Vec<PublicEvent>,
}

pub struct HostService {
    context: Context,
}

impl HostService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub async fn page(&self, slug: &str) -> error::Result<HostPage> {
        let hosts = self.context.try_get_repository::<Host>()?;

        let Some(host) = hosts
            .find("slug", &Bson::String(slug.to_string()))
            .await?
        else {
            return Err(anyhow::anyhow!("No host found").code(404));
        };

        let events = self
            .context
            .try_get_repository_manual::<EventsRepositoryObject>()?
            .find_by_host(host.id, default_timestamp())
            .await?;

        let preview = HostPreview {
            name: host.name.clone(),
            slug: host.slug.clone(),
        };
        let events = events
            .into_iter()
            .map(|event| event.publish(Some(preview.clone())))
            .collect();

        Ok(HostPage {
            host: host.into(),
            events,
        })
    }
}

use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::context::ServiceState;
use common::entities::host::Host;
use common::repository::mongo_repository::MongoRepository;
use common::repository::RepositoryObject;
use events::create_app;
use events::repositories::event::{EventsRepositoryObject, MongoEventsRepository};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").unwrap();

    let events: EventsRepositoryObject =
        Arc::new(MongoEventsRepository::new(&mongo_uri, "events", "events").await);
    let hosts: RepositoryObject<Host> =
        Arc::new(MongoRepository::new(&mongo_uri, "events", "hosts").await);

    let mut state = ServiceState::new("events".to_string());
    state.insert_manual(events);
    state.insert(hosts);

    let state = Arc::new(state);

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", 3002))?
        .run()
        .await
}

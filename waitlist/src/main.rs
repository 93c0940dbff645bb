use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::context::ServiceState;
use common::entities::waitlist::WaitlistEntry;
use common::repository::mongo_repository::MongoRepository;
use common::repository::ConfirmableRepositoryObject;
use waitlist::create_app;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").unwrap();

    let entries_repository = MongoRepository::new(&mongo_uri, "waitlist", "entries").await;
    entries_repository.ensure_unique_index("email").await;
    let entries: ConfirmableRepositoryObject<WaitlistEntry> = Arc::new(entries_repository);

    let mut state = ServiceState::new("waitlist".to_string());
    state.insert_manual(entries);

    let state = Arc::new(state);

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", 3003))?
        .run()
        .await
}

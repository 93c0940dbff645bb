use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::context::ServiceState;
use common::entities::letter::Letter;
use common::repository::mongo_repository::MongoRepository;
use common::repository::RepositoryObject;
use mail::create_app;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").unwrap();

    let letters: RepositoryObject<Letter> =
        Arc::new(MongoRepository::new(&mongo_uri, "mail", "letters").await);

    let mut state = ServiceState::new("mail".to_string());
    state.insert(letters);

    let state = Arc::new(state);

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", 3007))?
        .run()
        .await
}

use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::context::ServiceState;
use common::entities::code::Code;
use common::entities::session::Session;
use common::entities::user::User;
use common::repository::mongo_repository::MongoRepository;
use common::repository::RepositoryObject;
use users::create_app;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").unwrap();

    let users_repository = MongoRepository::new(&mongo_uri, "users", "users").await;
    users_repository.ensure_unique_index("email").await;
    let users: RepositoryObject<User> = Arc::new(users_repository);
    let sessions: RepositoryObject<Session> =
        Arc::new(MongoRepository::new(&mongo_uri, "users", "sessions").await);
    let codes: RepositoryObject<Code> =
        Arc::new(MongoRepository::new(&mongo_uri, "users", "codes").await);

    let mut state = ServiceState::new("users".to_string());
    state.insert(users);
    state.insert(sessions);
    state.insert(codes);

    let state = Arc::new(state);

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", 3001))?
        .run()
        .await
}

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{middleware, web, App};

use common::context::ServiceState;

pub mod handlers;
pub mod repositories;
pub mod service;

pub use handlers::event::*;
pub use handlers::geocode::*;
pub use handlers::host::*;

pub fn create_app(
    state: Arc<ServiceState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();
    // The fixed /api/events/* routes must come before the slug route.
    App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(state))
        .service(get_events)
        .service(get_events_map)
        .service(get_event_tags)
        .service(get_event_cities)
        .service(get_event_calendar)
        .service(get_event)
        .service(get_host)
        .service(get_geocode)
}

use actix_web::{
    get,
    web::{self, Json},
    HttpResponse,
};

use common::{context::Context, entities::event::PublicEvent, error};

use crate::service::event::{EventListQuery, EventListResponse, EventService};

#[utoipa::path(
    responses(
        (status = 200, body = EventListResponse)
    )
)]
#[get("/api/events")]
pub async fn get_events(
    context: Context,
    query: web::Query<EventListQuery>,
) -> error::Result<Json<EventListResponse>> {
    Ok(Json(
        EventService::new(context).list(query.into_inner()).await?,
    ))
}

#[get("/api/events/map")]
pub async fn get_events_map(
    context: Context,
    query: web::Query<EventListQuery>,
) -> error::Result<Json<Vec<PublicEvent>>> {
    Ok(Json(
        EventService::new(context).map(query.into_inner()).await?,
    ))
}

#[get("/api/events/tags")]
pub async fn get_event_tags(context: Context) -> error::Result<Json<Vec<String>>> {
    Ok(Json(EventService::new(context).tags().await?))
}

#[get("/api/events/cities")]
pub async fn get_event_cities(context: Context) -> error::Result<Json<Vec<String>>> {
    Ok(Json(EventService::new(context).cities().await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = PublicEvent),
        (status = 404, description = "Unknown or unpublished event")
    )
)]
#[get("/api/events/{slug}")]
pub async fn get_event(
    context: Context,
    slug: web::Path<String>,
) -> error::Result<Json<PublicEvent>> {
    Ok(Json(
        EventService::new(context)
            .find_by_slug(&slug.into_inner())
            .await?,
    ))
}

#[get("/api/events/{slug}/calendar")]
pub async fn get_event_calendar(
    context: Context,
    slug: web::Path<String>,
) -> error::Result<HttpResponse> {
    let (filename, ics) = EventService::new(context)
        .calendar(&slug.into_inner())
        .await?;

    Ok(HttpResponse::Ok()
        .content_type("text/calendar; charset=utf-8")
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(ics))
}

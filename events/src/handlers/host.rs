use actix_web::{
    get,
    web::{self, Json},
};

use common::{context::Context, error};

use crate::service::host::{HostPage, HostService};

#[utoipa::path(
    responses(
        (status = 200, body = HostPage),
        (status = 404, description = "Unknown host")
    )
)]
#[get("/api/hosts/{slug}")]
pub async fn get_host(context: Context, slug: web::Path<String>) -> error::Result<Json<HostPage>> {
    Ok(Json(
        HostService::new(context).page(&slug.into_inner()).await?,
    ))
}

use actix_web::{
    get,
    web::{self, Json},
};
use serde::Deserialize;

use common::{
    context::Context,
    error::{self, AddCode},
};

use crate::service::geo::{self, GeocodeResult};

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub query: String,
}

#[utoipa::path(
    responses(
        (status = 200, body = GeocodeResult),
        (status = 404, description = "Nothing found for the query")
    )
)]
#[get("/api/geocode")]
pub async fn get_geocode(
    context: Context,
    query: web::Query<GeocodeQuery>,
) -> error::Result<Json<GeocodeResult>> {
    let query = query.into_inner().query;
    if query.trim().is_empty() {
        return Err(anyhow::anyhow!("Query must not be empty").code(400));
    }

    geo::geocode(context.client(), &query)
        .await?
        .map(Json)
        .ok_or_else(|| anyhow::anyhow!("No place found").code(404))
}

use actix_web::{get, web::Json};

use common::{context::Context, entities::user::PublicUser, error};

use crate::service::auth::AuthService;

#[utoipa::path(
    responses(
        (status = 200, body = PublicUser),
        (status = 401, description = "Not signed in")
    )
)]
#[get("/api/users/me")]
pub async fn get_me(context: Context) -> error::Result<Json<PublicUser>> {
    Ok(Json(AuthService::new(context).me().await?))
}

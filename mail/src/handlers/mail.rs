use actix_web::{post, web::Json, HttpResponse};

use common::{context::Context, entities::letter::CreateLetter, error};

use crate::service::mail::MailService;

#[utoipa::path(
    request_body = CreateLetter,
    responses(
        (status = 200),
        (status = 403, description = "Caller may not send mail")
    )
)]
#[post("/api/mail")]
pub async fn send_mail(
    context: Context,
    Json(letter): Json<CreateLetter>,
) -> error::Result<HttpResponse> {
    MailService::new(context).send_letter(letter).await?;
    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::test::{self, init_service};
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    use common::auth::Auth;
    use common::context::ServiceState;
    use common::entities::letter::Letter;
    use common::repository::test_repository::TestRepository;
    use common::repository::{Repository, RepositoryObject};

    use crate::create_app;

    fn test_state() -> (Arc<ServiceState>, RepositoryObject<Letter>) {
        std::env::set_var("JWT_SECRET", "test-secret");

        let letters: RepositoryObject<Letter> = Arc::new(TestRepository::new());

        let mut state = ServiceState::new("mail".to_string());
        state.insert(letters.clone());

        (Arc::new(state), letters)
    }

    fn letter_body() -> serde_json::Value {
        json!({
            "email": "anna@example.com",
            "message": "Hallo!",
            "subject": "Testnachricht",
        })
    }

    #[actix_web::test]
    async fn test_anonymous_caller_cannot_send_mail() {
        let (state, letters) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/mail")
            .set_json(letter_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 403);

        assert!(letters.find_all(0, 10).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_user_cannot_send_mail() {
        let (state, letters) = test_state();
        let app = init_service(create_app(state)).await;

        let token = Auth::User(ObjectId::new()).to_token().unwrap();
        let req = test::TestRequest::post()
            .uri("/api/mail")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(letter_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 403);

        assert!(letters.find_all(0, 10).await.unwrap().is_empty());
    }
}

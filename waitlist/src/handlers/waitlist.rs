use actix_web::{
    get, post,
    web::{self, Json},
    HttpResponse,
};
use serde::Deserialize;

use common::{context::Context, error, services::FRONTEND};

use crate::service::waitlist::{ConfirmOutcome, WaitlistResult, WaitlistService, WaitlistSubmission};

#[utoipa::path(
    request_body(
        content = WaitlistSubmission
    ),
    responses(
        (status = 200, body = WaitlistResult)
    )
)]
#[post("/api/waitlist")]
pub async fn join_waitlist(
    context: Context,
    Json(data): web::Json<WaitlistSubmission>,
) -> error::Result<Json<WaitlistResult>> {
    Ok(Json(WaitlistService::new(context).submit(data).await?))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: Option<String>,
}

#[get("/api/confirm")]
pub async fn confirm(
    context: Context,
    query: web::Query<ConfirmQuery>,
) -> error::Result<HttpResponse> {
    let indicator = match query.token.as_deref() {
        None | Some("") => "invalid",
        Some(token) => match WaitlistService::new(context).confirm(token).await? {
            ConfirmOutcome::Success => "success",
            ConfirmOutcome::AlreadyOrInvalid => "already",
        },
    };

    Ok(HttpResponse::Found()
        .append_header((
            "Location",
            format!("{}/?confirmed={}", FRONTEND.as_str(), indicator),
        ))
        .finish())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::test::{self, init_service};
    use mongodb::bson::{oid::ObjectId, Bson};

    use common::context::ServiceState;
    use common::entities::waitlist::WaitlistEntry;
    use common::repository::test_repository::TestRepository;
    use common::repository::{ConfirmableRepositoryObject, Repository};

    use crate::create_app;
    use crate::service::waitlist::{WaitlistResult, WaitlistSubmission};

    fn test_state() -> (Arc<ServiceState>, ConfirmableRepositoryObject<WaitlistEntry>) {
        std::env::set_var("JWT_SECRET", "test-secret");

        let entries: ConfirmableRepositoryObject<WaitlistEntry> =
            Arc::new(TestRepository::new());

        let mut state = ServiceState::new("waitlist".to_string());
        state.insert_manual(entries.clone());

        (Arc::new(state), entries)
    }

    fn submission(email: &str) -> WaitlistSubmission {
        WaitlistSubmission {
            email: email.to_string(),
            name: Some("Maja".to_string()),
            role: Some("Coach".to_string()),
            city: Some("Kiel".to_string()),
        }
    }

    #[actix_web::test]
    async fn test_join_waitlist() {
        let (state, entries) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/waitlist")
            .set_json(&submission("Maja@Example.COM "))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: WaitlistResult = test::read_body_json(resp).await;
        assert!(body.success);

        // Email is normalized to lowercase before it becomes the identity key.
        let entry = entries
            .find("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(!entry.confirmed);
        assert_eq!(entry.confirmation_token.len(), 32);
    }

    #[actix_web::test]
    async fn test_duplicate_submission_keeps_single_row_and_token() {
        let (state, entries) = test_state();
        let app = init_service(create_app(state)).await;

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/waitlist")
                .set_json(&submission("maja@example.com"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());

            let body: WaitlistResult = test::read_body_json(resp).await;
            assert!(body.success);
        }

        let rows = entries
            .find_many("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    // Two submissions racing for the same address resolve inside one
    // repository operation: the loser gets the winner's row back and no
    // second row ever exists, regardless of interleaving.
    #[actix_web::test]
    async fn test_losing_insert_for_same_email_gets_existing_row() {
        let (_, entries) = test_state();

        let entry = |token: &str| WaitlistEntry {
            id: ObjectId::new(),
            email: "maja@example.com".to_string(),
            name: None,
            role: None,
            city: None,
            confirmed: false,
            confirmation_token: token.to_string(),
            confirmed_at: None,
            created_at: 0,
        };
        let email = Bson::String("maja@example.com".to_string());

        let winner = entries
            .insert_unique("email", &email, &entry("first-token"))
            .await
            .unwrap();
        assert!(winner.is_none());

        let loser = entries
            .insert_unique("email", &email, &entry("second-token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loser.confirmation_token, "first-token");

        let rows = entries.find_many("email", &email).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].confirmation_token, "first-token");
    }

    #[actix_web::test]
    async fn test_invalid_email_is_rejected_locally() {
        let (state, entries) = test_state();
        let app = init_service(create_app(state)).await;

        for email in ["", "   ", "not-an-email"] {
            let req = test::TestRequest::post()
                .uri("/api/waitlist")
                .set_json(&submission(email))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());

            let body: WaitlistResult = test::read_body_json(resp).await;
            assert!(!body.success);
        }

        assert!(entries.find_all(0, 10).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_confirm_token_is_single_use() {
        let (state, entries) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/waitlist")
            .set_json(&submission("maja@example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let token = entries
            .find("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap()
            .unwrap()
            .confirmation_token;

        let req = test::TestRequest::get()
            .uri(&format!("/api/confirm?token={}", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get("Location").unwrap(),
            "/?confirmed=success"
        );

        let entry = entries
            .find("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(entry.confirmed);
        assert!(entry.confirmed_at.is_some());

        // Second visit: the token is spent, state stays unchanged.
        let req = test::TestRequest::get()
            .uri(&format!("/api/confirm?token={}", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get("Location").unwrap(),
            "/?confirmed=already"
        );
    }

    #[actix_web::test]
    async fn test_confirm_without_token() {
        let (state, _entries) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::get().uri("/api/confirm").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get("Location").unwrap(),
            "/?confirmed=invalid"
        );
    }

    #[actix_web::test]
    async fn test_confirm_unknown_token() {
        let (state, _entries) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::get()
            .uri("/api/confirm?token=doesnotexist")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get("Location").unwrap(),
            "/?confirmed=already"
        );
    }

    #[actix_web::test]
    async fn test_resubmit_after_confirmation_sends_no_new_token() {
        let (state, entries) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/waitlist")
            .set_json(&submission("maja@example.com"))
            .to_request();
        test::call_service(&app, req).await;

        let token = entries
            .find("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap()
            .unwrap()
            .confirmation_token;

        let req = test::TestRequest::get()
            .uri(&format!("/api/confirm?token={}", token))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/waitlist")
            .set_json(&submission("maja@example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: WaitlistResult = test::read_body_json(resp).await;
        assert!(body.success);

        let entry = entries
            .find("email", &Bson::String("maja@example.com".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(entry.confirmed);
        assert_eq!(entry.confirmation_token, token);
    }
}

use actix_web::{post, web::Json, HttpRequest, HttpResponse};
use serde_json::json;

use common::{
    auth::ACCESS_TOKEN_TTL_SECONDS,
    auth_session::{
        expired_cookie, refresh_token_from_request, session_cookie, ACCESS_COOKIE, REFRESH_COOKIE,
        REFRESH_TTL_SECONDS,
    },
    context::Context,
    entities::user::PublicUser,
    error::{self, AddCode},
};

use crate::service::auth::{
    AuthService, LoginRequest, ResetPasswordRequest, SignupRequest, UpdatePasswordRequest,
    MSG_NOT_SIGNED_IN,
};

/// Peer address forwarded to the captcha verification, honoring
/// X-Forwarded-For when running behind the proxy.
fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}

#[utoipa::path(
    request_body = SignupRequest,
    responses(
        (status = 200, body = PublicUser),
        (status = 409, description = "Address already registered")
    )
)]
#[post("/api/auth/signup")]
pub async fn signup(
    context: Context,
    req: HttpRequest,
    Json(request): Json<SignupRequest>,
) -> error::Result<HttpResponse> {
    let tokens = AuthService::new(context)
        .signup(request, client_ip(&req).as_deref())
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_COOKIE,
            tokens.access_token,
            ACCESS_TOKEN_TTL_SECONDS,
        ))
        .cookie(session_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token,
            REFRESH_TTL_SECONDS,
        ))
        .json(tokens.user))
}

#[utoipa::path(
    request_body = LoginRequest,
    responses(
        (status = 200, body = PublicUser),
        (status = 401, description = "Wrong email or password")
    )
)]
#[post("/api/auth/login")]
pub async fn login(
    context: Context,
    req: HttpRequest,
    Json(request): Json<LoginRequest>,
) -> error::Result<HttpResponse> {
    let tokens = AuthService::new(context)
        .login(request, client_ip(&req).as_deref())
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_COOKIE,
            tokens.access_token,
            ACCESS_TOKEN_TTL_SECONDS,
        ))
        .cookie(session_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token,
            REFRESH_TTL_SECONDS,
        ))
        .json(tokens.user))
}

#[post("/api/auth/logout")]
pub async fn logout(context: Context, req: HttpRequest) -> error::Result<HttpResponse> {
    if let Some(refresh_token) = refresh_token_from_request(&req) {
        AuthService::new(context).logout(&refresh_token).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_COOKIE))
        .cookie(expired_cookie(REFRESH_COOKIE))
        .json(json!({"ok": true})))
}

#[post("/api/auth/refresh")]
pub async fn refresh(context: Context, req: HttpRequest) -> error::Result<HttpResponse> {
    let Some(refresh_token) = refresh_token_from_request(&req) else {
        return Err(anyhow::anyhow!(MSG_NOT_SIGNED_IN).code(401));
    };

    let tokens = AuthService::new(context).refresh(&refresh_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_COOKIE,
            tokens.access_token,
            ACCESS_TOKEN_TTL_SECONDS,
        ))
        .json(tokens.user))
}

/// Always answers with ok, whether or not the address is registered.
#[post("/api/auth/reset-password")]
pub async fn reset_password(
    context: Context,
    req: HttpRequest,
    Json(request): Json<ResetPasswordRequest>,
) -> error::Result<HttpResponse> {
    AuthService::new(context)
        .reset_password(request, client_ip(&req).as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({"ok": true})))
}

#[post("/api/auth/update-password")]
pub async fn update_password(
    context: Context,
    Json(request): Json<UpdatePasswordRequest>,
) -> error::Result<HttpResponse> {
    AuthService::new(context).update_password(request).await?;
    Ok(HttpResponse::Ok().json(json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::test::{self, init_service};
    use serde_json::json;

    use mongodb::bson::{oid::ObjectId, Bson};

    use common::auth_session::{ACCESS_COOKIE, REFRESH_COOKIE};
    use common::context::ServiceState;
    use common::entities::code::Code;
    use common::entities::session::Session;
    use common::entities::user::{PublicUser, User};
    use common::repository::test_repository::TestRepository;
    use common::repository::{Repository, RepositoryObject};

    use crate::create_app;

    type TestState = (
        Arc<ServiceState>,
        RepositoryObject<Code>,
        RepositoryObject<Session>,
    );

    fn test_state() -> TestState {
        std::env::set_var("JWT_SECRET", "test-secret");

        let users: RepositoryObject<User> = Arc::new(TestRepository::new());
        let sessions: RepositoryObject<Session> = Arc::new(TestRepository::new());
        let codes: RepositoryObject<Code> = Arc::new(TestRepository::new());

        let mut state = ServiceState::new("users".to_string());
        state.insert(users);
        state.insert(sessions.clone());
        state.insert(codes.clone());

        (Arc::new(state), codes, sessions)
    }

    fn signup_body(email: &str) -> serde_json::Value {
        json!({
            "email": email,
            "password": "korrektes-pferd",
            "name": "Anna Beispiel",
        })
    }

    fn signup_request(email: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_body(email))
    }

    fn response_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> Cookie<'static> {
        resp.response()
            .cookies()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.into_owned())
            .unwrap_or_else(|| panic!("no {} cookie set", name))
    }

    #[actix_web::test]
    async fn test_signup_login_me_round_trip() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("Anna@Example.com").to_request()).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "anna@example.com", "password": "korrektes-pferd"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let access = response_cookie(&resp, ACCESS_COOKIE);
        let refresh = response_cookie(&resp, REFRESH_COOKIE);
        assert!(access.http_only().unwrap_or(false));
        assert!(refresh.http_only().unwrap_or(false));

        let user: PublicUser = test::read_body_json(resp).await;
        assert_eq!(user.email, "anna@example.com");

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .cookie(access)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let me: PublicUser = test::read_body_json(resp).await;
        assert_eq!(me.email, "anna@example.com");
    }

    #[actix_web::test]
    async fn test_duplicate_signup_is_rejected() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_body("anna@example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 409);
    }

    // Two accounts created for the same address at the same time: only the
    // first write lands, the second gets the existing row back.
    #[actix_web::test]
    async fn test_losing_signup_for_same_email_creates_no_row() {
        let users: RepositoryObject<User> = Arc::new(TestRepository::new());
        let email = Bson::String("anna@example.com".to_string());

        let account = |name: &str| User {
            id: ObjectId::new(),
            email: "anna@example.com".to_string(),
            password: "hash".to_string(),
            salt: "salt".to_string(),
            name: name.to_string(),
            created_at: 0,
        };

        let first = users
            .insert_unique("email", &email, &account("Anna"))
            .await
            .unwrap();
        assert!(first.is_none());

        let second = users
            .insert_unique("email", &email, &account("Andere Anna"))
            .await
            .unwrap();
        assert_eq!(second.unwrap().name, "Anna");

        let rows = users.find_many("email", &email).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[actix_web::test]
    async fn test_weak_password_is_rejected() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({"email": "anna@example.com", "password": "kurz", "name": "Anna"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn test_wrong_password_is_rejected() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "anna@example.com", "password": "falsches-pferd"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
    }

    #[actix_web::test]
    async fn test_me_without_session_is_rejected() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let req = test::TestRequest::get().uri("/api/users/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
    }

    #[actix_web::test]
    async fn test_refresh_issues_new_access_cookie() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "anna@example.com", "password": "korrektes-pferd"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let refresh = response_cookie(&resp, REFRESH_COOKIE);

        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .cookie(refresh)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let access = response_cookie(&resp, ACCESS_COOKIE);
        assert!(!access.value().is_empty());
    }

    // The 30-day lifetime holds server-side too, not only in the cookie:
    // an outlived session row is rejected and removed.
    #[actix_web::test]
    async fn test_outlived_session_cannot_refresh() {
        let (state, _, sessions) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());
        let refresh = response_cookie(&resp, REFRESH_COOKIE);

        let token = Bson::String(refresh.value().to_string());
        let mut session = sessions.find("token", &token).await.unwrap().unwrap();
        sessions
            .delete("id", &Bson::ObjectId(session.id))
            .await
            .unwrap();
        session.created_at = 0;
        sessions.insert(&session).await.unwrap();

        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .cookie(refresh)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);

        assert!(sessions.find("token", &token).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_logout_expires_cookies_and_kills_session() {
        let (state, _, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "anna@example.com", "password": "korrektes-pferd"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let refresh = response_cookie(&resp, REFRESH_COOKIE);

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .cookie(refresh.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let cleared = response_cookie(&resp, REFRESH_COOKIE);
        assert!(cleared.value().is_empty());

        // The session is gone, so the refresh token no longer works.
        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .cookie(refresh)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
    }

    #[actix_web::test]
    async fn test_password_reset_flow() {
        let (state, codes, _) = test_state();
        let app = init_service(create_app(state)).await;

        let resp = test::call_service(&app, signup_request("anna@example.com").to_request()).await;
        assert!(resp.status().is_success());

        // Unknown addresses get the same answer as registered ones.
        let req = test::TestRequest::post()
            .uri("/api/auth/reset-password")
            .set_json(json!({"email": "niemand@example.com"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/reset-password")
            .set_json(json!({"email": "anna@example.com"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let code = codes
            .find("email", &mongodb::bson::Bson::String("anna@example.com".to_string()))
            .await
            .unwrap()
            .expect("reset code stored");

        let req = test::TestRequest::post()
            .uri("/api/auth/update-password")
            .set_json(json!({
                "code": code.code,
                "password": "neues-korrektes-pferd",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "anna@example.com", "password": "neues-korrektes-pferd"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        // Spent codes are rejected.
        let req = test::TestRequest::post()
            .uri("/api/auth/update-password")
            .set_json(json!({
                "code": "AAAAAA",
                "password": "noch-ein-passwort",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }
}

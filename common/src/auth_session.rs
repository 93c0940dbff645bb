use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;

pub const ACCESS_COOKIE: &str = "portal_access";
pub const REFRESH_COOKIE: &str = "portal_refresh";

/// Refresh cookie lifetime: 30 days.
pub const REFRESH_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;

fn is_production() -> bool {
    std::env::var("PRODUCTION").is_ok()
}

pub fn session_cookie(name: &'static str, value: String, max_age: i64) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age))
        .finish()
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), 0)
}

pub fn access_token_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get("Authorization")
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn refresh_token_from_request(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

use std::env::var;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref PROTOCOL: String = var("PROTOCOL").unwrap_or_else(|_| "http".to_string());
    pub static ref FRONTEND: String = var("FRONTEND").unwrap_or_default();
    pub static ref USERS_SERVICE: String =
        var("USERS_SERVICE_URL").unwrap_or_else(|_| "localhost:3001".to_string());
    pub static ref EVENTS_SERVICE: String =
        var("EVENTS_SERVICE_URL").unwrap_or_else(|_| "localhost:3002".to_string());
    pub static ref WAITLIST_SERVICE: String =
        var("WAITLIST_SERVICE_URL").unwrap_or_else(|_| "localhost:3003".to_string());
    pub static ref MAIL_SERVICE: String =
        var("MAIL_SERVICE_URL").unwrap_or_else(|_| "localhost:3007".to_string());
}

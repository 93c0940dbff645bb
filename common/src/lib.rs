use chrono::Utc;

pub mod auth;
pub mod auth_session;
pub mod context;
pub mod entities;
pub mod error;
pub mod repository;
pub mod services;
pub mod verification;

pub fn default_timestamp() -> i64 {
    Utc::now().timestamp_micros()
}

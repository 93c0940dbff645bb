pub mod event;
pub mod geocode;
pub mod host;

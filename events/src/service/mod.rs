pub mod event;
pub mod geo;
pub mod host;
pub mod ics;

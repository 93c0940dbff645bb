pub mod code;
pub mod event;
pub mod host;
pub mod letter;
pub mod session;
pub mod user;
pub mod waitlist;

pub mod auth;
pub mod contents;
pub mod programs;
pub mod progress;
pub mod topics;
pub mod units;
pub mod users;

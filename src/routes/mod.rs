pub mod admin;
pub mod attendance;
pub mod auth;
pub mod health;
pub mod reports;
pub mod users;

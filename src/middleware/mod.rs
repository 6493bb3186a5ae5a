pub mod auth;
pub mod web_app;

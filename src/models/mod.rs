pub mod report;
pub mod user;
pub mod work_session;

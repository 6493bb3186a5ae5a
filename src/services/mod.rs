pub mod export_service;
pub mod report_service;
pub mod session_service;
pub mod user_service;

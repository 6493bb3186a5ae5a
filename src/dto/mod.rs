pub mod admin_dto;
pub mod attendance_dto;

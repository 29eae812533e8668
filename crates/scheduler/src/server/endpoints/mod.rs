pub mod auth;
pub mod courses;
pub mod status;
pub mod users;

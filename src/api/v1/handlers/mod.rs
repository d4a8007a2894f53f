pub mod auth;
pub mod users;
pub mod well_known;

pub mod error;
pub mod refresh_token_repo;
pub mod user_repo;

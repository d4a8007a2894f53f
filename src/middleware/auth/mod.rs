pub mod access;
pub mod authorize;
pub mod refresh;

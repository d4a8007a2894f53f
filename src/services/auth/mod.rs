pub mod account;
pub mod claims;
pub mod credentials;
pub mod directory;
pub mod keys;
pub mod token_issuer;
pub mod token_service;

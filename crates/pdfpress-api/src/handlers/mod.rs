pub mod auth;
pub mod compress;

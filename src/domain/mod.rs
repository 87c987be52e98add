pub mod error;
pub mod models;
pub mod repository;
pub mod selection;
pub mod store;
pub mod totp;

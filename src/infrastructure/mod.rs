pub mod config;
pub mod env;
pub mod keychain;
pub mod memory;

//! Startup helpers used by the `opsdeck` binary before the registry exists

pub mod config;
pub mod database;

pub use config::load_config;
pub use database::init_database;

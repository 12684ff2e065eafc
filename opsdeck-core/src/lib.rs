//! Shared building blocks for the opsdeck control plane: node models,
//! configuration, logging and durable node storage.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;

pub use config::Config;
pub use error::{Error, Result};

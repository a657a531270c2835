// src/core/mod.rs
//! Configuration, storage and the shared error type

pub mod config_manager;
pub mod database;
pub mod error;

pub use config_manager::ConfigManager;
pub use database::Database;
pub use error::{AppError, AppResult};

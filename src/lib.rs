//! Leadscope: turns LinkedIn post engagement into scored, deduplicated leads.

pub mod admin_cli;
pub mod auth;
pub mod core;
pub mod models;
pub mod repositories;
pub mod services;
pub mod web;

pub use crate::core::{AppError, AppResult, ConfigManager, Database};
pub use web::{build_rocket, start_web_server};

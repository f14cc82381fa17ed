rust_i18n::i18n!("locales", fallback = "en");

pub mod auth;
pub mod backup;
pub mod config;
pub mod crypto;
pub mod database;
pub mod entity;
pub mod error;
pub mod i18n;
pub mod models;
pub mod openai;
pub mod repositories;
pub mod services;
pub mod settings;
pub mod settings_sync;
pub mod signal_filter;
pub mod signal_generator;
pub mod telegram;

pub use config::Config;
pub use database::get_db_connection;
pub use error::{AppError, Result};

// src/config/mod.rs
pub mod server;

pub use server::{Config, DatabaseConfig, FileConfig, LogFormat, RateLimitConfig};

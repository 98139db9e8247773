//! Shared identifiers and configuration for Stockbook.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe references between documents and master records
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, PostingConfig, ServerConfig};

//! Core business logic for Stockbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Everything between the form a user filled in and the rows a repository writes
//! lives here.
//!
//! # Modules
//!
//! - `posting` - Line normalization, balancing, and the posting error taxonomy
//! - `numbering` - Date-scoped document number rules
//! - `projection` - Two-level list projection and its cache

pub mod numbering;
pub mod posting;
pub mod projection;

//! Token counting module
//!
//! Estimates usage figures using tiktoken-rs.

pub mod counter;

pub use counter::{SharedTokenCounter, TokenCounter};

//! Mock infrastructure for external services
//!
//! - Gemini web front-end (app page, generate, upload)


pub use gemini::*;

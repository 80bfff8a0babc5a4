//! Middleware module
//!
//! Contains Tower middleware for bearer-secret authentication.

pub mod auth;

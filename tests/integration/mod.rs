//! Integration tests for the relay
//!
//! These tests drive the real router end to end. Most use a stub backend;
//! `gemini_web` runs the real web client against a mocked front-end.

mod attachments;
mod gemini_web;

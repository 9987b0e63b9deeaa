//! Core infrastructure for sharpen.
//!
//! This crate provides language-agnostic infrastructure:
//! - The rewrite pass contract and pipeline
//! - Error types and exit-code mapping for CLI output

pub mod error;
pub mod rewrite;

//! Sharpen: source rewriter for C# codebases.
//!
//! Replaces `var` declarations with their resolved explicit types and
//! synthesizes API controller attributes from inferred action-result
//! types, preserving all original formatting in untouched regions.

// Core infrastructure - re-exported from sharpen-core
pub use sharpen_core::error;
pub use sharpen_core::rewrite;

// Language support
pub use sharpen_csharp as csharp;

// Front door for the CLI binary
pub mod cli;
pub mod output;

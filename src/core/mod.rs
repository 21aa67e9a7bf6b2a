//! Core types and error handling for the prompt manager.
//!
//! This module hosts the crate-wide error taxonomy ([`PromptError`]) and the
//! [`Result`] alias used by every public operation. All fallible APIs in this
//! crate return exactly one typed error from the taxonomy - never a generic
//! or untyped failure.

pub mod error;

pub use error::{PromptError, Result};

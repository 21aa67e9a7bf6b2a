//! Error handling for the prompt manager.
//!
//! The error system is built around a single strongly-typed enum,
//! [`PromptError`], so callers can match on precise failure modes instead of
//! inspecting strings. Every variant carries enough context to act on: which
//! prompt, version, or parameter was at fault.
//!
//! # Error Categories
//!
//! - **Configuration**: [`PromptError::ConfigNotFound`],
//!   [`PromptError::ConfigValidation`]
//! - **Templates**: [`PromptError::TemplateNotFound`],
//!   [`PromptError::VersionNotFound`], [`PromptError::TemplateRender`]
//! - **Parameters**: [`PromptError::ParameterValidation`]
//! - **Caching**: [`PromptError::Cache`]
//!
//! # Propagation Policy
//!
//! Validation and load errors are never silently swallowed or downgraded.
//! The one designed exception lives in
//! [`PromptManager::render_messages`](crate::manager::PromptManager::render_messages):
//! a missing *optional* system template is treated as "that part is absent"
//! while the same failure on the mandatory user template propagates. Cache
//! misses are never errors - absence falls through to the authoritative
//! computation path.
//!
//! # Examples
//!
//! ```rust,no_run
//! use prompt_manager::core::PromptError;
//!
//! fn handle(err: PromptError) {
//!     match err {
//!         PromptError::ConfigNotFound { name } => {
//!             eprintln!("no config named '{name}' - check your configs directory");
//!         }
//!         PromptError::VersionNotFound { template_type, version, available } => {
//!             eprintln!("no {template_type}/{version}; available: {available:?}");
//!         }
//!         other => eprintln!("{other}"),
//!     }
//! }
//! ```

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PromptError>;

/// The main error type for prompt manager operations.
///
/// Each variant represents a specific failure mode in the load / validate /
/// render pipeline. Variants are designed for pattern matching; the
/// [`std::fmt::Display`] representations are written for end users.
#[derive(Error, Debug)]
pub enum PromptError {
    /// No configuration document exists for the requested prompt name.
    #[error("Prompt configuration not found: {name}")]
    ConfigNotFound {
        /// The prompt name that was requested
        name: String,
    },

    /// A configuration document exists but is unusable.
    ///
    /// Covers empty documents, YAML syntax errors, schema violations
    /// (including unknown parameter types), and cycles in the `extends`
    /// chain.
    #[error("Invalid prompt configuration '{name}': {reason}")]
    ConfigValidation {
        /// The prompt name whose configuration failed validation
        name: String,
        /// What was wrong with the document
        reason: String,
    },

    /// No template file matches the requested path.
    #[error("Template not found: {path}")]
    TemplateNotFound {
        /// Template path relative to the template directory
        path: String,
    },

    /// A requested template version does not exist for the template type.
    ///
    /// This is the core-level wrapper around [`PromptError::TemplateNotFound`]
    /// produced by the manager: it enriches the failure with the versions
    /// that actually exist for the template type.
    #[error(
        "Version '{version}' not found for template type '{template_type}'. Available versions: {available:?}"
    )]
    VersionNotFound {
        /// Template type that was searched (e.g. "system", "user")
        template_type: String,
        /// The version that was requested
        version: String,
        /// Versions that exist for this template type
        available: Vec<String>,
    },

    /// Template rendering failed after the template was located.
    ///
    /// Typically an undefined variable, a filter error, or a syntax error in
    /// the template body.
    #[error("Failed to render template '{path}': {reason}")]
    TemplateRender {
        /// Template path that failed to render
        path: String,
        /// Rendering failure detail, with the engine's error chain flattened
        reason: String,
    },

    /// A caller-supplied parameter failed validation against its spec.
    ///
    /// Raised for a missing required parameter with no default, a value that
    /// cannot be coerced to its declared type, or (in strict mode) a
    /// parameter with no declared spec.
    #[error("Invalid parameter '{name}': {reason}")]
    ParameterValidation {
        /// The parameter name at fault
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A cache-layer invariant was violated.
    ///
    /// Reserved for misuse such as a zero capacity or a cache key component
    /// containing the key separator. Not expected during normal operation.
    #[error("Cache error: {reason}")]
    Cache {
        /// Description of the invariant violation
        reason: String,
    },

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PromptError {
    /// Shorthand for a [`PromptError::ConfigValidation`].
    pub fn config_validation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`PromptError::ParameterValidation`].
    pub fn parameter_validation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParameterValidation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`PromptError::Cache`].
    pub fn cache(reason: impl Into<String>) -> Self {
        Self::Cache {
            reason: reason.into(),
        }
    }
}

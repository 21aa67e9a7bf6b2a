//! Versioned prompt template management for LLM applications.
//!
//! This crate loads per-prompt configuration (parameter specs, metadata,
//! LLM settings) with inheritance, validates caller-supplied parameters
//! against typed specs, renders versioned Tera templates, and caches both
//! template resolution and rendered output to avoid repeated work.
//!
//! # Architecture Overview
//!
//! A prompt is a named, versioned family of templates plus its
//! configuration. Configs are YAML documents that may `extend` a parent
//! config; templates live under `{type}/{version}.tera` (for example
//! `system/v2.tera`). The pipeline on every render:
//!
//! 1. [`config::ConfigLoader`] loads the config, resolving the `extends`
//!    chain by deep merge and memoizing the result per name.
//! 2. [`config::PromptConfig::validate_parameters`] validates and coerces
//!    the caller's parameters, filling declared defaults.
//! 3. [`cache::CacheKeyBuilder`] derives a deterministic key from the
//!    template identity, version, and a fingerprint of the validated
//!    parameters.
//! 4. [`cache::MultiLevelCache`] is consulted for a cached render; on a
//!    miss [`templating::VersionedRenderer`] renders the template and the
//!    result is stored back under that key.
//!
//! # Core Modules
//!
//! - [`config`] - config schema, parameter validation, inheritance, loading
//! - [`cache`] - LRU caches, the multi-level cache, and cache keys
//! - [`templating`] - the Tera renderer and version resolution
//! - [`manager`] - the [`manager::PromptManager`] facade tying it together
//! - [`core`] - the [`core::PromptError`] taxonomy and `Result` alias
//!
//! # Example
//!
//! ```rust,no_run
//! use prompt_manager::{ManagerOptions, PromptManager};
//! use prompt_manager::config::ValidationMode;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> prompt_manager::core::Result<()> {
//! let mut manager = PromptManager::with_options(
//!     "prompts",
//!     ManagerOptions {
//!         validation_mode: ValidationMode::Strict,
//!         ..ManagerOptions::default()
//!     },
//! )?;
//!
//! let shared: BTreeMap<String, serde_json::Value> =
//!     [("symbol".to_string(), json!("BTC-USD"))].into_iter().collect();
//!
//! let messages = manager.render_messages("trading_agent", Some("v2"), None, None, &shared)?;
//! for message in messages {
//!     println!("{}: {}", serde_json::to_string(&message.role).unwrap(), message.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The crate is single-process and synchronous: operations execute to
//! completion on the calling thread with no internal locking or background
//! work. Mutating operations take `&mut self` - cache lookups included,
//! since they update recency order - so sharing an instance across threads
//! requires external serialization.

pub mod cache;
pub mod config;
pub mod core;
pub mod manager;
pub mod templating;

pub use cache::{CacheKeyBuilder, CacheStats, LruCache, MultiLevelCache, MultiLevelStats};
pub use config::{
    ConfigLoader, ConfigStore, FsConfigStore, ParameterSpec, ParameterType, PromptConfig,
    PromptMetadata, ValidationMode,
};
pub use self::core::{PromptError, Result};
pub use manager::{ChatMessage, ManagerOptions, PromptInfo, PromptManager, Role};
pub use templating::{TemplateRenderer, VersionedRenderer};

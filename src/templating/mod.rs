//! Template rendering with Tera.
//!
//! Rendering is deliberately thin: the core of this crate treats the engine
//! as an external collaborator reached through
//! [`TemplateRenderer::render`]. Templates live under one directory and are
//! loaded eagerly at construction, which makes Tera's `{% include %}` work
//! for the `includes` a config declares - every template in the directory is
//! addressable by its relative path.
//!
//! [`VersionedRenderer`] layers the `{type}/{version}.tera` path convention
//! on top, so `("system", "v2")` resolves to `system/v2.tera` and the
//! versions available for a template type can be listed.

pub mod renderer;

pub use renderer::{TemplateRenderer, VersionedRenderer, DEFAULT_VERSION_PATTERN};

use std::collections::BTreeMap;

use serde_json::Value;
use tera::Context as TeraContext;

use crate::core::{PromptError, Result};

/// Build a Tera context from a validated parameter map.
pub fn context_from_params(params: &BTreeMap<String, Value>) -> Result<TeraContext> {
    TeraContext::from_serialize(params).map_err(|e| PromptError::TemplateRender {
        path: "<context>".to_string(),
        reason: format!("failed to build template context: {e}"),
    })
}

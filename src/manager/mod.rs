//! The `PromptManager` facade.
//!
//! Wires the configuration loader, versioned renderer, and multi-level
//! cache into one API:
//!
//! ```rust,no_run
//! use prompt_manager::manager::PromptManager;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> prompt_manager::core::Result<()> {
//! let mut manager = PromptManager::new("prompts")?;
//!
//! let params: BTreeMap<String, serde_json::Value> = [
//!     ("symbol".to_string(), json!("BTC-USD")),
//!     ("price".to_string(), json!(45000.0)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let prompt = manager.render("trading_agent", "system", Some("v2"), &params)?;
//! println!("{prompt}");
//! # Ok(())
//! # }
//! ```
//!
//! There is no process-wide shared instance: the hosting application
//! constructs a manager once and passes it by reference or ownership to
//! whatever needs it. All mutating operations (including cache lookups,
//! which update recency order) take `&mut self`; concurrent callers must
//! serialize access externally.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheKeyBuilder, MultiLevelCache, MultiLevelStats};
use crate::config::{
    ConfigLoader, FsConfigStore, ParameterSpec, PromptConfig, ValidationMode,
};
use crate::core::{PromptError, Result};
use crate::templating::{context_from_params, VersionedRenderer};

/// Options for constructing a [`PromptManager`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Subdirectory of the prompts root holding config documents
    pub config_subdir: String,
    /// Subdirectory of the prompts root holding templates
    pub template_subdir: String,
    /// Whether the multi-level cache is enabled
    pub enable_cache: bool,
    /// Capacity of the template-path tier
    pub template_cache_size: usize,
    /// Capacity of the rendered-output tier
    pub render_cache_size: usize,
    /// Development mode: configs reload on every access and the cache is
    /// forced off, so edits to configs and templates show up immediately
    pub dev_mode: bool,
    /// How parameters without a declared spec are treated
    pub validation_mode: ValidationMode,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            config_subdir: "configs".to_string(),
            template_subdir: "templates".to_string(),
            enable_cache: true,
            template_cache_size: 50,
            render_cache_size: 200,
            dev_mode: false,
            validation_mode: ValidationMode::Permissive,
        }
    }
}

/// Message role in a rendered conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// User turn
    User,
}

/// One rendered message, ready for an LLM chat API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Rendered template content
    pub content: String,
}

/// Summary of a prompt's configuration, as returned by
/// [`PromptManager::info`].
#[derive(Debug, Clone, Serialize)]
pub struct PromptInfo {
    /// Prompt name
    pub name: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Default version
    pub current_version: String,
    /// Author
    pub author: Option<String>,
    /// Creation date
    pub created_at: Option<String>,
    /// Last update date
    pub updated_at: Option<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Declared parameter specs
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Opaque LLM settings
    pub llm_config: Option<Value>,
    /// Parent config named by this document, if any (provenance only)
    pub extends: Option<String>,
    /// Auxiliary template references
    pub includes: Vec<String>,
}

/// Main interface for the prompt management system.
///
/// Integrates configuration loading with inheritance, parameter validation,
/// versioned template rendering, and caching behind a single API.
#[derive(Debug)]
pub struct PromptManager {
    loader: ConfigLoader,
    renderer: VersionedRenderer,
    cache: MultiLevelCache,
    dev_mode: bool,
    validation_mode: ValidationMode,
}

impl PromptManager {
    /// Create a manager over `prompts_dir` with default options.
    ///
    /// Expects `prompts_dir/configs/*.yaml` and
    /// `prompts_dir/templates/{type}/{version}.tera`.
    pub fn new(prompts_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(prompts_dir, ManagerOptions::default())
    }

    /// Create a manager with explicit options.
    pub fn with_options(prompts_dir: impl AsRef<Path>, options: ManagerOptions) -> Result<Self> {
        let prompts_dir = prompts_dir.as_ref();
        let store = FsConfigStore::new(prompts_dir.join(&options.config_subdir))?;
        let renderer = VersionedRenderer::new(prompts_dir.join(&options.template_subdir))?;
        let cache_enabled = options.enable_cache && !options.dev_mode;
        let cache = MultiLevelCache::new(
            options.template_cache_size,
            options.render_cache_size,
            cache_enabled,
        )?;

        Ok(Self {
            loader: ConfigLoader::new(Box::new(store)),
            renderer,
            cache,
            dev_mode: options.dev_mode,
            validation_mode: options.validation_mode,
        })
    }

    /// Load the resolved configuration for `prompt_name`.
    ///
    /// Memoized per name, except in dev mode where every access re-reads
    /// from source.
    pub fn load_config(&mut self, prompt_name: &str) -> Result<Arc<PromptConfig>> {
        if self.dev_mode {
            self.loader.load_fresh(prompt_name)
        } else {
            self.loader.load(prompt_name)
        }
    }

    /// Render one template of `prompt_name`.
    ///
    /// `version` defaults to the config's `current_version`. Parameters are
    /// validated against the config before the cache key is built, so two
    /// calls that resolve to the same values share a cache entry even when
    /// one relied on defaults.
    ///
    /// # Errors
    ///
    /// [`PromptError::VersionNotFound`] when no template exists for the
    /// type/version pair, with the available versions listed; the usual
    /// config and parameter errors from loading and validation; and
    /// [`PromptError::TemplateRender`] when substitution fails.
    pub fn render(
        &mut self,
        prompt_name: &str,
        template_type: &str,
        version: Option<&str>,
        parameters: &BTreeMap<String, Value>,
    ) -> Result<String> {
        let config = self.load_config(prompt_name)?;
        let version = version
            .map(str::to_string)
            .unwrap_or_else(|| config.metadata.current_version.clone());

        let resolved = config.validate_parameters(parameters, self.validation_mode)?;
        self.render_resolved(prompt_name, template_type, &version, &resolved)
    }

    /// Render an already-validated parameter map.
    fn render_resolved(
        &mut self,
        prompt_name: &str,
        template_type: &str,
        version: &str,
        resolved: &BTreeMap<String, Value>,
    ) -> Result<String> {
        let identity = format!("{prompt_name}:{template_type}");
        let cache_key = CacheKeyBuilder::build(&identity, Some(version), resolved)?;

        if let Some(rendered) = self.cache.get_render(&cache_key) {
            tracing::debug!("Render cache hit for key {cache_key}");
            return Ok(rendered.clone());
        }

        let template_path = self.resolve_template_path(template_type, version)?;
        let context = context_from_params(resolved)?;
        let rendered = self
            .renderer
            .renderer()
            .render(&template_path, &context)
            .map_err(|e| self.enrich_template_not_found(e, template_type, version))?;

        self.cache.put_render(cache_key, rendered.clone());
        Ok(rendered)
    }

    /// Render system and user prompts as a message list.
    ///
    /// The system part is optional: a missing system template for the
    /// requested version is treated as "no system message" rather than an
    /// error. The user part is mandatory and its failures propagate.
    ///
    /// `shared_params` apply to both parts; `system_params` and
    /// `user_params` override shared values for their part. When neither
    /// map carries a `current_date`, today's date (`YYYY-MM-DD`) is injected
    /// into both. The injected date is added after validation, so strict
    /// mode never rejects it; a caller-supplied `current_date` goes through
    /// validation like any other parameter.
    pub fn render_messages(
        &mut self,
        prompt_name: &str,
        version: Option<&str>,
        system_params: Option<&BTreeMap<String, Value>>,
        user_params: Option<&BTreeMap<String, Value>>,
        shared_params: &BTreeMap<String, Value>,
    ) -> Result<Vec<ChatMessage>> {
        let config = self.load_config(prompt_name)?;
        let version = version
            .map(str::to_string)
            .unwrap_or_else(|| config.metadata.current_version.clone());

        let mut system = shared_params.clone();
        if let Some(overrides) = system_params {
            system.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let mut user = shared_params.clone();
        if let Some(overrides) = user_params {
            user.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let today = (!system.contains_key("current_date")
            && !user.contains_key("current_date"))
        .then(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        let mut messages = Vec::with_capacity(2);

        match self.render_part(&config, prompt_name, "system", &version, &system, today.as_deref())
        {
            Ok(content) => messages.push(ChatMessage {
                role: Role::System,
                content,
            }),
            Err(PromptError::TemplateNotFound { .. } | PromptError::VersionNotFound { .. }) => {
                tracing::debug!("No system template for '{prompt_name}', omitting system message");
            }
            Err(other) => return Err(other),
        }

        let content =
            self.render_part(&config, prompt_name, "user", &version, &user, today.as_deref())?;
        messages.push(ChatMessage {
            role: Role::User,
            content,
        });

        Ok(messages)
    }

    /// Validate one part's parameters and render, injecting `current_date`
    /// into the validated map when the caller supplied none.
    fn render_part(
        &mut self,
        config: &PromptConfig,
        prompt_name: &str,
        template_type: &str,
        version: &str,
        params: &BTreeMap<String, Value>,
        injected_date: Option<&str>,
    ) -> Result<String> {
        let mut resolved = config.validate_parameters(params, self.validation_mode)?;
        if let Some(date) = injected_date {
            // A config may declare current_date itself; a resolved value
            // wins over the injection, an unresolved null does not.
            let slot = resolved
                .entry("current_date".to_string())
                .or_insert(Value::Null);
            if slot.is_null() {
                *slot = Value::String(date.to_string());
            }
        }
        self.render_resolved(prompt_name, template_type, version, &resolved)
    }

    /// The LLM settings from a prompt's config, if declared.
    pub fn llm_config(&mut self, prompt_name: &str) -> Result<Option<Value>> {
        Ok(self.load_config(prompt_name)?.llm_config.clone())
    }

    /// Full description of a prompt's configuration.
    pub fn info(&mut self, prompt_name: &str) -> Result<PromptInfo> {
        let config = self.load_config(prompt_name)?;
        Ok(PromptInfo {
            name: config.metadata.name.clone(),
            description: config.metadata.description.clone(),
            current_version: config.metadata.current_version.clone(),
            author: config.metadata.author.clone(),
            created_at: config.metadata.created_at.clone(),
            updated_at: config.metadata.updated_at.clone(),
            tags: config.metadata.tags.clone(),
            parameters: config.parameters.clone(),
            llm_config: config.llm_config.clone(),
            extends: config.extends.clone(),
            includes: config.includes.clone(),
        })
    }

    /// List every available prompt configuration name.
    pub fn list_prompts(&self) -> Result<Vec<String>> {
        self.loader.list()
    }

    /// List the template versions available for a template type.
    pub fn list_versions(&self, template_type: &str) -> Vec<String> {
        self.renderer.list_versions(template_type)
    }

    /// Reload one prompt's configuration from source.
    ///
    /// Cache entries are not indexed by originating prompt, so the whole
    /// multi-level cache is cleared - a coarse but simple invalidation.
    pub fn reload(&mut self, prompt_name: &str) -> Result<()> {
        self.loader.load_fresh(prompt_name)?;
        self.cache.clear();
        Ok(())
    }

    /// Clear the multi-level cache and the config memo.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.loader.clear();
    }

    /// Cache statistics for both tiers.
    pub fn cache_stats(&self) -> MultiLevelStats {
        self.cache.stats()
    }

    /// Resolve and memoize the template path for a type/version pair.
    ///
    /// The template tier caches the resolution (including the existence
    /// check); a miss validates against the loaded template set and fails
    /// with [`PromptError::VersionNotFound`] listing what does exist.
    fn resolve_template_path(&mut self, template_type: &str, version: &str) -> Result<String> {
        let path_key = CacheKeyBuilder::build(template_type, Some(version), &BTreeMap::new())?;
        if let Some(path) = self.cache.get_template(&path_key) {
            return Ok(path.clone());
        }

        let path = self.renderer.template_path(template_type, version);
        if !self.renderer.renderer().has_template(&path) {
            return Err(PromptError::VersionNotFound {
                template_type: template_type.to_string(),
                version: version.to_string(),
                available: self.renderer.list_versions(template_type),
            });
        }

        self.cache.put_template(path_key, path.clone());
        Ok(path)
    }

    /// Wrap a template-not-found from the renderer into a version-not-found
    /// carrying the available versions.
    fn enrich_template_not_found(
        &self,
        error: PromptError,
        template_type: &str,
        version: &str,
    ) -> PromptError {
        match error {
            PromptError::TemplateNotFound { .. } => PromptError::VersionNotFound {
                template_type: template_type.to_string(),
                version: version.to_string(),
                available: self.renderer.list_versions(template_type),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ManagerOptions::default();
        assert_eq!(options.config_subdir, "configs");
        assert_eq!(options.template_subdir, "templates");
        assert!(options.enable_cache);
        assert!(!options.dev_mode);
        assert_eq!(options.validation_mode, ValidationMode::Permissive);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }
}

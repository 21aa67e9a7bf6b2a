//! Tera-backed template renderer with version resolution.

use std::path::{Path, PathBuf};

use tera::{Context as TeraContext, Tera};

use crate::core::{PromptError, Result};

/// Default path convention for versioned templates:
/// `("system", "v1")` resolves to `system/v1.tera`.
pub const DEFAULT_VERSION_PATTERN: &str = "{type}/{version}.tera";

/// Template renderer wrapping a Tera instance.
///
/// Every `*.tera` file under the template directory is parsed at
/// construction and addressed by its path relative to that directory. The
/// renderer performs no file system access after construction and no
/// network access at any point.
pub struct TemplateRenderer {
    tera: Tera,
    template_dir: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer over every `*.tera` file under `template_dir`.
    ///
    /// Fails with [`PromptError::TemplateNotFound`] when the directory does
    /// not exist, and with [`PromptError::TemplateRender`] when any template
    /// in the directory fails to parse.
    pub fn new(template_dir: impl Into<PathBuf>) -> Result<Self> {
        let template_dir = template_dir.into();
        if !template_dir.is_dir() {
            return Err(PromptError::TemplateNotFound {
                path: template_dir.display().to_string(),
            });
        }

        let glob = format!("{}/**/*.tera", template_dir.display());
        let tera = Tera::new(&glob).map_err(|e| PromptError::TemplateRender {
            path: template_dir.display().to_string(),
            reason: flatten_tera_error(&e),
        })?;

        tracing::debug!(
            "Loaded {} template(s) from {}",
            tera.get_template_names().count(),
            template_dir.display()
        );

        Ok(Self { tera, template_dir })
    }

    /// The directory templates were loaded from.
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Whether a template exists at `template_path`.
    pub fn has_template(&self, template_path: &str) -> bool {
        self.tera.get_template_names().any(|n| n == template_path)
    }

    /// List every loaded template path, sorted.
    pub fn list_templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    /// Render the template at `template_path` with `context`.
    ///
    /// Fails with [`PromptError::TemplateNotFound`] when no such template
    /// was loaded, and [`PromptError::TemplateRender`] for any failure
    /// during substitution (undefined variable, filter error, ...).
    pub fn render(&self, template_path: &str, context: &TeraContext) -> Result<String> {
        tracing::debug!("Rendering template '{template_path}'");
        self.tera
            .render(template_path, context)
            .map_err(|e| match &e.kind {
                tera::ErrorKind::TemplateNotFound(name) => PromptError::TemplateNotFound {
                    path: name.clone(),
                },
                _ => PromptError::TemplateRender {
                    path: template_path.to_string(),
                    reason: flatten_tera_error(&e),
                },
            })
    }

    /// Render a one-off template from a string.
    ///
    /// The string still sees the loaded templates, so `{% include %}` works
    /// from ad-hoc content too.
    pub fn render_str(&mut self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera
            .render_str(template, context)
            .map_err(|e| PromptError::TemplateRender {
                path: "<string>".to_string(),
                reason: flatten_tera_error(&e),
            })
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("template_dir", &self.template_dir)
            .field("templates", &self.tera.get_template_names().count())
            .finish()
    }
}

/// Flatten a Tera error and its source chain into one line.
///
/// Tera's `Display` is terse ("Failed to render 'x'"); the useful detail
/// lives in the source chain.
fn flatten_tera_error(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Template renderer with version management.
///
/// Resolves `(template_type, version)` pairs to template paths using a
/// configurable pattern (default [`DEFAULT_VERSION_PATTERN`]) and can list
/// the versions that exist for a template type. Version listing assumes the
/// type-directory layout: every template directly under `{type}/` counts as
/// one version of that type.
pub struct VersionedRenderer {
    renderer: TemplateRenderer,
    version_pattern: String,
}

impl VersionedRenderer {
    /// Create a versioned renderer with the default path pattern.
    pub fn new(template_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_pattern(template_dir, DEFAULT_VERSION_PATTERN)
    }

    /// Create a versioned renderer with a custom path pattern.
    ///
    /// The pattern must contain the `{type}` and `{version}` placeholders.
    pub fn with_pattern(
        template_dir: impl Into<PathBuf>,
        version_pattern: impl Into<String>,
    ) -> Result<Self> {
        let version_pattern = version_pattern.into();
        if !version_pattern.contains("{type}") || !version_pattern.contains("{version}") {
            return Err(PromptError::TemplateRender {
                path: version_pattern.clone(),
                reason: "version pattern must contain {type} and {version}".to_string(),
            });
        }
        Ok(Self {
            renderer: TemplateRenderer::new(template_dir)?,
            version_pattern,
        })
    }

    /// The underlying unversioned renderer.
    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Resolve a `(template_type, version)` pair to a template path.
    pub fn template_path(&self, template_type: &str, version: &str) -> String {
        self.version_pattern
            .replace("{type}", template_type)
            .replace("{version}", version)
    }

    /// Whether a template exists for `(template_type, version)`.
    pub fn has_version(&self, template_type: &str, version: &str) -> bool {
        self.renderer
            .has_template(&self.template_path(template_type, version))
    }

    /// Render the template for `(template_type, version)`.
    pub fn render(
        &self,
        template_type: &str,
        version: &str,
        context: &TeraContext,
    ) -> Result<String> {
        self.renderer
            .render(&self.template_path(template_type, version), context)
    }

    /// List the versions available for a template type, sorted.
    pub fn list_versions(&self, template_type: &str) -> Vec<String> {
        let prefix = format!("{template_type}/");
        let mut versions: Vec<String> = self
            .renderer
            .list_templates()
            .into_iter()
            .filter_map(|name| {
                let rest = name.strip_prefix(&prefix)?;
                if rest.contains('/') {
                    return None;
                }
                Path::new(rest)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect();
        versions.sort();
        versions
    }

    /// The lexicographically last version for a template type, if any.
    ///
    /// Works for the common `v1`, `v2`, ... scheme; callers with more than
    /// nine versions of one type should pick versions explicitly.
    pub fn latest_version(&self, template_type: &str) -> Option<String> {
        self.list_versions(template_type).pop()
    }
}

impl std::fmt::Debug for VersionedRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedRenderer")
            .field("renderer", &self.renderer)
            .field("version_pattern", &self.version_pattern)
            .finish()
    }
}

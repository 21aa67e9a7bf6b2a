//! Prompt configuration: schema types, parameter validation, and loading.
//!
//! A prompt is described by one YAML document per name with four sections:
//!
//! ```yaml
//! metadata:
//!   name: trading_agent
//!   description: Market analysis prompts
//!   current_version: v2
//!   tags: [trading, analysis]
//! extends: base_agent          # optional parent config
//! parameters:
//!   symbol: { type: string, required: true }
//!   max_risk: { type: float, default: 2.0, required: false }
//! llm_config:                  # opaque, passed through untouched
//!   model: gpt-4o
//!   temperature: 0.2
//! includes:                    # auxiliary templates, passed to the renderer
//!   - common/risk.tera
//! ```
//!
//! [`ConfigLoader`] resolves the `extends` chain by deep merge (mappings
//! merge recursively, sequences concatenate parent-then-child, scalars are
//! overridden by the child) and memoizes resolved configs per name.
//! [`PromptConfig::validate_parameters`] checks a caller-supplied parameter
//! map against the declared [`ParameterSpec`]s, filling defaults and
//! coercing values through an explicit per-type conversion table.

pub mod loader;

pub use loader::{ConfigLoader, ConfigStore, FsConfigStore};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strsim::levenshtein;

use crate::core::{PromptError, Result};

/// Maximum Levenshtein distance, as a percentage of the unknown name's
/// length, for a declared parameter to be offered as a spelling suggestion.
const SUGGESTION_THRESHOLD_PERCENT: usize = 50;

/// How [`PromptConfig::validate_parameters`] treats parameters with no
/// declared spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Unknown parameters pass through unchanged. The schema is open:
    /// callers may supply template variables the config never declared.
    #[default]
    Permissive,
    /// Unknown parameters fail with
    /// [`PromptError::ParameterValidation`], with a closest-spelling
    /// suggestion when one of the declared names is close enough.
    Strict,
}

/// Declared type of a template parameter.
///
/// An unrecognized type string in a config document fails at
/// deserialization time with a schema error, not later at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// UTF-8 string
    String,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// Boolean
    Bool,
    /// Ordered sequence
    List,
    /// String-keyed mapping
    Map,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

fn default_required() -> bool {
    true
}

fn default_version() -> String {
    "v1".to_string()
}

/// Specification for one template parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Declared parameter type
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Default value used when the caller supplies nothing
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether the parameter must resolve to a value (default: true)
    #[serde(default = "default_required")]
    pub required: bool,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl ParameterSpec {
    /// Resolve a single caller-supplied value against this spec.
    ///
    /// An absent (or explicit null) value resolves to the default when one
    /// exists, fails when the parameter is required with no default, and
    /// otherwise resolves to null. A present value of the declared type is
    /// returned unchanged; a mismatched value goes through the coercion
    /// table below.
    ///
    /// # Coercions
    ///
    /// | declared | accepted source values |
    /// |----------|------------------------|
    /// | string   | number, bool |
    /// | int      | string (base-10), bool, float with zero fraction |
    /// | float    | string, int |
    /// | bool     | "true"/"false"/"yes"/"no"/"1"/"0" (case-insensitive), 0, 1 |
    /// | list     | none |
    /// | map      | none |
    ///
    /// Every other pairing fails with [`PromptError::ParameterValidation`].
    pub fn validate_value(&self, name: &str, value: Option<&Value>) -> Result<Value> {
        let value = match value {
            None | Some(Value::Null) => {
                return match &self.default {
                    Some(default) => Ok(default.clone()),
                    None if self.required => Err(PromptError::parameter_validation(
                        name,
                        "required parameter is missing and has no default",
                    )),
                    None => Ok(Value::Null),
                };
            }
            Some(value) => value,
        };

        if self.matches_type(value) {
            return Ok(value.clone());
        }

        self.coerce(name, value)
    }

    /// Whether `value` already has the declared type, no coercion needed.
    fn matches_type(&self, value: &Value) -> bool {
        match self.param_type {
            ParameterType::String => value.is_string(),
            ParameterType::Int => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_f64(),
            ParameterType::Bool => value.is_boolean(),
            ParameterType::List => value.is_array(),
            ParameterType::Map => value.is_object(),
        }
    }

    /// Explicit per-type conversion table for mismatched values.
    fn coerce(&self, name: &str, value: &Value) -> Result<Value> {
        let coerced = match (self.param_type, value) {
            (ParameterType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParameterType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (ParameterType::Int, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::from)
            }
            (ParameterType::Int, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
            (ParameterType::Int, Value::Number(n)) => n.as_f64().and_then(|f| {
                // Only lossless float-to-int conversions are allowed.
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Some(Value::from(f as i64))
                } else {
                    None
                }
            }),

            (ParameterType::Float, Value::String(s)) => {
                s.trim().parse::<f64>().ok().map(Value::from)
            }
            (ParameterType::Float, Value::Number(n)) => n.as_i64().map(|i| Value::from(i as f64)),

            (ParameterType::Bool, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (ParameterType::Bool, Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => None,
            },

            // Lists and maps have no scalar coercions.
            _ => None,
        };

        coerced.ok_or_else(|| {
            PromptError::parameter_validation(
                name,
                format!(
                    "cannot convert value {value} to type {}",
                    self.param_type
                ),
            )
        })
    }
}

/// Metadata section of a prompt configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier for this prompt
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Author of the prompt
    #[serde(default)]
    pub author: Option<String>,
    /// Creation date
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update date
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Default version used when the caller does not pick one
    #[serde(default = "default_version")]
    pub current_version: String,
}

/// Complete, resolved configuration for one prompt.
///
/// After loading, inheritance has already been applied: `extends` is
/// retained only as provenance (which parent this document named), never
/// re-resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Prompt metadata
    pub metadata: PromptMetadata,
    /// Parameter specifications by name
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// LLM settings (model, temperature, ...), passed through untouched
    #[serde(default)]
    pub llm_config: Option<Value>,
    /// Name of the parent config this document extends, if any
    #[serde(default)]
    pub extends: Option<String>,
    /// Auxiliary template references, passed through to the renderer
    #[serde(default)]
    pub includes: Vec<String>,
}

impl PromptConfig {
    /// Get the parameter specification for `name`, if declared.
    pub fn parameter_spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.get(name)
    }

    /// Validate a caller-supplied parameter map against the declared specs.
    ///
    /// Every supplied key with a spec is routed through
    /// [`ParameterSpec::validate_value`]. Keys without a spec pass through
    /// unchanged in [`ValidationMode::Permissive`] and are rejected in
    /// [`ValidationMode::Strict`]. Declared parameters the caller did not
    /// supply are filled from their defaults, or fail when required with no
    /// default. The result is total: every declared parameter plus any
    /// permitted extra keys.
    pub fn validate_parameters(
        &self,
        params: &BTreeMap<String, Value>,
        mode: ValidationMode,
    ) -> Result<BTreeMap<String, Value>> {
        let mut resolved = BTreeMap::new();

        for (key, value) in params {
            match self.parameters.get(key) {
                Some(spec) => {
                    resolved.insert(key.clone(), spec.validate_value(key, Some(value))?);
                }
                None => match mode {
                    ValidationMode::Permissive => {
                        resolved.insert(key.clone(), value.clone());
                    }
                    ValidationMode::Strict => {
                        let mut reason = "no parameter with this name is declared".to_string();
                        if let Some(suggestion) = self.closest_parameter_name(key) {
                            reason.push_str(&format!(". Did you mean '{suggestion}'?"));
                        }
                        return Err(PromptError::parameter_validation(key, reason));
                    }
                },
            }
        }

        for (key, spec) in &self.parameters {
            if !params.contains_key(key) {
                resolved.insert(key.clone(), spec.validate_value(key, None)?);
            }
        }

        Ok(resolved)
    }

    /// Closest declared parameter name by Levenshtein distance, within the
    /// suggestion threshold.
    fn closest_parameter_name(&self, target: &str) -> Option<&str> {
        self.parameters
            .keys()
            .map(|name| (name, levenshtein(target, name)))
            .filter(|(_, dist)| *dist <= target.len() * SUGGESTION_THRESHOLD_PERCENT / 100)
            .min_by_key(|(_, dist)| *dist)
            .map(|(name, _)| name.as_str())
    }
}

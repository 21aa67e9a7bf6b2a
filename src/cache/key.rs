//! Deterministic cache key construction.
//!
//! A cache key encodes three components: a template identity (for the
//! manager this is `"{prompt_name}:{template_type}"`), an optional version
//! tag, and an optional fingerprint of the validated parameters. The encoded
//! form is `identity|v:version|p:fingerprint` with absent components simply
//! omitted.
//!
//! Determinism is the whole point: two calls with the same identity and
//! version and value-equal parameter maps must produce byte-identical keys
//! regardless of the order parameters were supplied in. Parameters arrive as
//! a [`BTreeMap`], so the canonical JSON serialization is ordered by
//! construction, and nested objects serialize through [`serde_json::Map`]
//! (a BTreeMap without the `preserve_order` feature) which sorts as well.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::{PromptError, Result};

/// Separator between key components.
///
/// Identity and version values containing this character are rejected by
/// [`CacheKeyBuilder::build`]. Without that guard, `("a|b", None)` and
/// `("a", Some("b"))` would collide.
const SEPARATOR: char = '|';

/// Prefix marking the version component of an encoded key.
const VERSION_TAG: &str = "v:";

/// Prefix marking the parameter-fingerprint component of an encoded key.
const PARAMS_TAG: &str = "p:";

/// A cache key decomposed back into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCacheKey {
    /// The template identity the key was built from
    pub identity: String,
    /// The version tag, if one was encoded
    pub version: Option<String>,
    /// The hex parameter fingerprint, if parameters were encoded
    pub params_hash: Option<String>,
}

/// Builder for deterministic, order-independent cache keys.
///
/// # Collision Policy
///
/// The parameter fingerprint is a SHA-256 hash of the canonical JSON
/// serialization. It is a best-effort fingerprint for bounded key length,
/// not a cryptographic guarantee of uniqueness: two distinct parameter sets
/// hashing to the same digest would be served the same cached render. At 256
/// bits that risk is negligible, but callers that cannot tolerate any
/// collision must not rely on this mechanism.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build a cache key from identity, optional version, and parameters.
    ///
    /// An empty parameter map encodes no fingerprint component at all, so
    /// "no parameters" and "same parameters" are both stable encodings.
    ///
    /// # Errors
    ///
    /// Fails with [`PromptError::Cache`] when `identity` or `version`
    /// contains the key separator `|`.
    pub fn build(
        identity: &str,
        version: Option<&str>,
        parameters: &BTreeMap<String, Value>,
    ) -> Result<String> {
        if identity.contains(SEPARATOR) {
            return Err(PromptError::cache(format!(
                "cache key identity '{identity}' contains reserved separator '{SEPARATOR}'"
            )));
        }
        if let Some(version) = version {
            if version.contains(SEPARATOR) {
                return Err(PromptError::cache(format!(
                    "cache key version '{version}' contains reserved separator '{SEPARATOR}'"
                )));
            }
        }

        let mut key = String::from(identity);

        if let Some(version) = version {
            key.push(SEPARATOR);
            key.push_str(VERSION_TAG);
            key.push_str(version);
        }

        if !parameters.is_empty() {
            key.push(SEPARATOR);
            key.push_str(PARAMS_TAG);
            key.push_str(&Self::fingerprint(parameters)?);
        }

        Ok(key)
    }

    /// Decompose a key produced by [`build`](CacheKeyBuilder::build).
    ///
    /// Recovers exactly what `build` encoded for any key it can produce.
    pub fn parse(key: &str) -> ParsedCacheKey {
        let mut parts = key.split(SEPARATOR);
        // `split` yields at least one element even for the empty string.
        let identity = parts.next().unwrap_or_default().to_string();
        let mut version = None;
        let mut params_hash = None;

        for part in parts {
            if let Some(rest) = part.strip_prefix(VERSION_TAG) {
                version = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix(PARAMS_TAG) {
                params_hash = Some(rest.to_string());
            }
        }

        ParsedCacheKey {
            identity,
            version,
            params_hash,
        }
    }

    /// SHA-256 over the canonical JSON serialization of the parameter map,
    /// hex encoded.
    fn fingerprint(parameters: &BTreeMap<String, Value>) -> Result<String> {
        let canonical = serde_json::to_string(parameters)
            .map_err(|e| PromptError::cache(format!("failed to serialize parameters: {e}")))?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(hex::encode(digest))
    }
}

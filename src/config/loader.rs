//! Configuration loading, inheritance resolution, and memoization.
//!
//! Documents come from a [`ConfigStore`] - the seam between the loader and
//! wherever configs actually live. [`FsConfigStore`] reads `<name>.yaml`
//! files from a directory; tests supply in-memory stores.
//!
//! Inheritance works on the raw YAML values, before schema validation:
//! a document declaring `extends: parent` has the fully-resolved parent
//! deep-merged underneath it, so the child only needs to state what differs.
//! Cycles anywhere in the chain fail with a validation error listing the
//! offending path.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value as YamlValue;

use super::PromptConfig;
use crate::core::{PromptError, Result};

/// Source of raw configuration documents, keyed by prompt name.
///
/// Implementations only deal in raw text; parsing, inheritance, and schema
/// validation belong to [`ConfigLoader`].
pub trait ConfigStore {
    /// Load the raw document for `name`.
    ///
    /// Fails with [`PromptError::ConfigNotFound`] when no document with
    /// that name exists.
    fn load_raw(&self, name: &str) -> Result<String>;

    /// List the names of every available document, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// [`ConfigStore`] reading `<name>.yaml` files from one directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    config_dir: PathBuf,
}

impl FsConfigStore {
    /// Create a store over `config_dir`.
    ///
    /// Fails with [`PromptError::ConfigNotFound`] when the directory does
    /// not exist.
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !config_dir.is_dir() {
            return Err(PromptError::ConfigNotFound {
                name: config_dir.display().to_string(),
            });
        }
        Ok(Self { config_dir })
    }

    /// The directory this store reads from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, name: &str) -> Result<String> {
        // Names are bare identifiers; path components could escape the
        // config directory. Dots inside a name (a..b) are fine.
        let mut components = Path::new(name).components();
        let bare = matches!(components.next(), Some(Component::Normal(c)) if c == name)
            && components.next().is_none();
        if !bare || name.contains('\\') {
            return Err(PromptError::config_validation(
                name,
                "prompt names must be bare identifiers without path components",
            ));
        }

        let path = self.config_dir.join(format!("{name}.yaml"));
        if !path.is_file() {
            return Err(PromptError::ConfigNotFound {
                name: name.to_string(),
            });
        }
        Ok(std::fs::read_to_string(&path)?)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.config_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Loads named configurations, resolves `extends` chains, and memoizes the
/// result per name.
pub struct ConfigLoader {
    store: Box<dyn ConfigStore>,
    configs: HashMap<String, Arc<PromptConfig>>,
}

impl ConfigLoader {
    /// Create a loader over the given store.
    pub fn new(store: Box<dyn ConfigStore>) -> Self {
        Self {
            store,
            configs: HashMap::new(),
        }
    }

    /// Load the resolved configuration for `name`, memoized.
    ///
    /// The first load per name parses the document, resolves its `extends`
    /// chain, and validates the merged result against the schema; later
    /// loads return the memoized object.
    pub fn load(&mut self, name: &str) -> Result<Arc<PromptConfig>> {
        if let Some(config) = self.configs.get(name) {
            tracing::debug!("Returning memoized config for '{name}'");
            return Ok(Arc::clone(config));
        }
        self.load_fresh(name)
    }

    /// Load `name` from the store, bypassing and replacing the memo entry.
    pub fn load_fresh(&mut self, name: &str) -> Result<Arc<PromptConfig>> {
        let mut chain = Vec::new();
        let document = self.resolve_document(name, &mut chain)?;

        let config: PromptConfig = serde_yaml::from_value(document).map_err(|e| {
            PromptError::config_validation(name, format!("schema validation failed: {e}"))
        })?;

        tracing::debug!("Loaded config '{name}' (extends: {:?})", config.extends);
        let config = Arc::new(config);
        self.configs.insert(name.to_string(), Arc::clone(&config));
        Ok(config)
    }

    /// Drop the memo entry for `name`. Returns whether one existed.
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.configs.remove(name).is_some()
    }

    /// Drop every memoized config.
    pub fn clear(&mut self) {
        self.configs.clear();
    }

    /// List every available configuration name.
    pub fn list(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    /// Parse `name` and deep-merge its resolved parent underneath it.
    ///
    /// `chain` is the path of names currently being resolved; revisiting
    /// one means the `extends` graph has a cycle.
    fn resolve_document(&self, name: &str, chain: &mut Vec<String>) -> Result<YamlValue> {
        if chain.iter().any(|visited| visited == name) {
            chain.push(name.to_string());
            return Err(PromptError::config_validation(
                name,
                format!("cycle in extends chain: {}", chain.join(" -> ")),
            ));
        }
        chain.push(name.to_string());

        let raw = self.store.load_raw(name)?;
        let mut document: YamlValue = serde_yaml::from_str(&raw)
            .map_err(|e| PromptError::config_validation(name, format!("invalid YAML: {e}")))?;

        if document.is_null() {
            return Err(PromptError::config_validation(name, "empty config document"));
        }
        if !document.is_mapping() {
            return Err(PromptError::config_validation(
                name,
                "config document must be a mapping",
            ));
        }

        let extends = match document.get("extends") {
            None | Some(YamlValue::Null) => None,
            Some(YamlValue::String(parent)) => Some(parent.clone()),
            Some(other) => {
                return Err(PromptError::config_validation(
                    name,
                    format!("'extends' must be a config name, got: {other:?}"),
                ));
            }
        };

        if let Some(parent_name) = extends {
            tracing::debug!("Config '{name}' extends '{parent_name}', resolving parent");
            let mut parent = self.resolve_document(&parent_name, chain)?;
            // Each level decides its own ancestry: the parent's `extends`
            // never propagates into the merged result.
            if let YamlValue::Mapping(mapping) = &mut parent {
                mapping.remove("extends");
            }
            document = deep_merge(parent, document);
        }

        chain.pop();
        Ok(document)
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("memoized", &self.configs.len())
            .finish_non_exhaustive()
    }
}

/// Merge `child` over `parent`, key by key.
///
/// Mappings merge recursively, sequences concatenate parent-then-child
/// (duplicates kept), and any other pairing lets the child win outright.
fn deep_merge(parent: YamlValue, child: YamlValue) -> YamlValue {
    match (parent, child) {
        (YamlValue::Mapping(mut merged), YamlValue::Mapping(child)) => {
            for (key, child_value) in child {
                let value = match merged.remove(&key) {
                    Some(parent_value) => deep_merge(parent_value, child_value),
                    None => child_value,
                };
                merged.insert(key, value);
            }
            YamlValue::Mapping(merged)
        }
        (YamlValue::Sequence(mut merged), YamlValue::Sequence(child)) => {
            merged.extend(child);
            YamlValue::Sequence(merged)
        }
        (_, child) => child,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationMode;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// In-memory store for exercising the loader without touching disk.
    struct MemoryStore {
        docs: HashMap<String, String>,
    }

    impl MemoryStore {
        fn new(docs: &[(&str, &str)]) -> Self {
            Self {
                docs: docs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl ConfigStore for MemoryStore {
        fn load_raw(&self, name: &str) -> Result<String> {
            self.docs
                .get(name)
                .cloned()
                .ok_or_else(|| PromptError::ConfigNotFound {
                    name: name.to_string(),
                })
        }

        fn list(&self) -> Result<Vec<String>> {
            let mut names: Vec<String> = self.docs.keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    fn loader(docs: &[(&str, &str)]) -> ConfigLoader {
        ConfigLoader::new(Box::new(MemoryStore::new(docs)))
    }

    #[test]
    fn test_load_simple_config() {
        let mut loader = loader(&[(
            "simple",
            "metadata:\n  name: simple\nparameters:\n  symbol:\n    type: string\n",
        )]);
        let config = loader.load("simple").unwrap();
        assert_eq!(config.metadata.name, "simple");
        assert_eq!(config.metadata.current_version, "v1");
        assert!(config.parameters.contains_key("symbol"));
    }

    #[test]
    fn test_missing_config_fails_not_found() {
        let mut loader = loader(&[]);
        assert!(matches!(
            loader.load("nope"),
            Err(PromptError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_document_fails_validation() {
        let mut loader = loader(&[("empty", ""), ("blank", "   \n")]);
        for name in ["empty", "blank"] {
            let err = loader.load(name).unwrap_err();
            assert!(matches!(err, PromptError::ConfigValidation { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn test_malformed_yaml_fails_validation() {
        let mut loader = loader(&[("bad", "metadata: [unclosed")]);
        assert!(matches!(
            loader.load("bad"),
            Err(PromptError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_unknown_parameter_type_fails_validation() {
        let mut loader = loader(&[(
            "bad_type",
            "metadata:\n  name: bad_type\nparameters:\n  x:\n    type: banana\n",
        )]);
        let err = loader.load("bad_type").unwrap_err();
        assert!(matches!(err, PromptError::ConfigValidation { .. }), "{err}");
    }

    #[test]
    fn test_three_level_extends_chain() {
        let mut loader = loader(&[
            (
                "a",
                concat!(
                    "metadata:\n  name: a\n  author: alice\n",
                    "parameters:\n  from_a:\n    type: string\n    default: base\n    required: false\n",
                    "  shared:\n    type: string\n    default: a_value\n    required: false\n",
                    "includes:\n  - common/a.tera\n",
                    "llm_config:\n  model: gpt-4o\n  temperature: 0.7\n",
                ),
            ),
            (
                "b",
                concat!(
                    "extends: a\n",
                    "metadata:\n  name: b\n",
                    "parameters:\n  shared:\n    type: string\n    default: b_value\n    required: false\n",
                    "llm_config:\n  temperature: 0.2\n",
                ),
            ),
            (
                "c",
                concat!(
                    "extends: b\n",
                    "metadata:\n  name: c\n",
                    "parameters:\n  shared:\n    type: string\n    default: c_value\n    required: false\n",
                    "includes:\n  - common/c.tera\n",
                ),
            ),
        ]);

        let c = loader.load("c").unwrap();

        // Set only in A: present unchanged.
        assert_eq!(c.metadata.author.as_deref(), Some("alice"));
        assert_eq!(
            c.parameters["from_a"].default.as_ref().unwrap(),
            &json!("base")
        );
        // Overridden at each level: nearest wins.
        assert_eq!(
            c.parameters["shared"].default.as_ref().unwrap(),
            &json!("c_value")
        );
        // Nested mapping merge: B's override and A's untouched field coexist.
        let llm = c.llm_config.as_ref().unwrap();
        assert_eq!(llm["model"], json!("gpt-4o"));
        assert_eq!(llm["temperature"], json!(0.2));
        // Sequences concatenate parent-then-child.
        assert_eq!(c.includes, vec!["common/a.tera", "common/c.tera"]);
        // Provenance: C's own extends survives, B's does not win.
        assert_eq!(c.extends.as_deref(), Some("b"));
    }

    #[test]
    fn test_list_concatenation_keeps_duplicates() {
        let mut loader = loader(&[
            ("base", "metadata:\n  name: base\nincludes:\n  - shared.tera\n"),
            (
                "child",
                "extends: base\nmetadata:\n  name: child\nincludes:\n  - shared.tera\n",
            ),
        ]);
        let child = loader.load("child").unwrap();
        assert_eq!(child.includes, vec!["shared.tera", "shared.tera"]);
    }

    #[test]
    fn test_direct_cycle_detected() {
        let mut loader = loader(&[("a", "extends: a\nmetadata:\n  name: a\n")]);
        let err = loader.load("a").unwrap_err();
        match err {
            PromptError::ConfigValidation { reason, .. } => {
                assert!(reason.contains("cycle"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_indirect_cycle_detected() {
        let mut loader = loader(&[
            ("a", "extends: b\nmetadata:\n  name: a\n"),
            ("b", "extends: c\nmetadata:\n  name: b\n"),
            ("c", "extends: a\nmetadata:\n  name: c\n"),
        ]);
        let err = loader.load("a").unwrap_err();
        match err {
            PromptError::ConfigValidation { reason, .. } => {
                assert!(reason.contains("a -> b -> c -> a"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_memoization_and_load_fresh() {
        let mut loader = loader(&[("p", "metadata:\n  name: p\n")]);
        let first = loader.load("p").unwrap();
        let second = loader.load("p").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let fresh = loader.load_fresh("p").unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(*first, *fresh);
    }

    #[test]
    fn test_invalidate_drops_memo_entry() {
        let mut loader = loader(&[("p", "metadata:\n  name: p\n")]);
        loader.load("p").unwrap();
        assert!(loader.invalidate("p"));
        assert!(!loader.invalidate("p"));
    }

    #[test]
    fn test_inherited_parameters_validate() {
        let mut loader = loader(&[
            (
                "base",
                concat!(
                    "metadata:\n  name: base\n",
                    "parameters:\n  max_risk:\n    type: float\n    default: 2.0\n    required: false\n",
                ),
            ),
            (
                "child",
                concat!(
                    "extends: base\n",
                    "metadata:\n  name: child\n",
                    "parameters:\n  symbol:\n    type: string\n",
                ),
            ),
        ]);
        let child = loader.load("child").unwrap();
        let supplied: BTreeMap<String, serde_json::Value> =
            [("symbol".to_string(), json!("ETH-USD"))]
                .into_iter()
                .collect();
        let resolved = child
            .validate_parameters(&supplied, ValidationMode::Strict)
            .unwrap();
        assert_eq!(resolved["max_risk"], json!(2.0));
        assert_eq!(resolved["symbol"], json!("ETH-USD"));
    }

    #[test]
    fn test_fs_store_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::new(dir.path()).unwrap();
        for name in ["../escape", "a/b", "..", "a\\b", ""] {
            assert!(
                matches!(
                    store.load_raw(name),
                    Err(PromptError::ConfigValidation { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_fs_store_allows_dots_inside_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a..b.yaml"), "metadata:\n  name: a..b\n").unwrap();
        std::fs::write(dir.path().join("v1.5.yaml"), "metadata:\n  name: v1.5\n").unwrap();

        let store = FsConfigStore::new(dir.path()).unwrap();
        assert!(store.load_raw("a..b").is_ok());
        assert!(store.load_raw("v1.5").is_ok());
    }

    #[test]
    fn test_fs_store_lists_yaml_stems_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "x: 1").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "x: 1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let store = FsConfigStore::new(dir.path()).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_fs_store_missing_dir_fails_at_construction() {
        assert!(matches!(
            FsConfigStore::new("/definitely/not/here"),
            Err(PromptError::ConfigNotFound { .. })
        ));
    }
}

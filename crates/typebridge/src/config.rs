//! Configuration for typebridge.
//!
//! Looked up in order:
//! 1. Per-project: `typebridge.toml`, then `.typebridge/config.toml`
//! 2. Global: `~/.config/typebridge/config.toml`
//!
//! Example `typebridge.toml`:
//! ```toml
//! provider = "deep"
//! module-root = "backend"
//! flavors = ["zod"]
//! enum-style = "tagged-union"
//! namespace-prefix-strip = ["example.com/app/"]
//!
//! [type-mappings]
//! "github.com/shopspring/decimal.Decimal" = "string"
//! ```

use crate::input::TypeMappings;
use crate::output::{CommentPolicy, EmitOptions, EnumStyle, OptionalType};
use crate::registry::FlavorRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which extraction strategy builds the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Parse Go sources.
    #[default]
    Deep,
    /// Read a runtime type catalog.
    Shallow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub provider: ProviderKind,
    /// Directory holding `go.mod` (deep provider).
    pub module_root: PathBuf,
    /// Runtime type catalog JSON (shallow provider).
    pub catalog: Option<PathBuf>,
    /// Packages extracted in addition to those the routes mention.
    pub extra_scope: Vec<String>,
    pub preserve_comments: CommentPolicy,
    pub enum_style: EnumStyle,
    pub optional_type: OptionalType,
    pub single_file: bool,
    pub namespace_prefix_strip: Vec<String>,
    /// Qualified Go type → primitive kind name.
    pub type_mappings: BTreeMap<String, String>,
    pub flavors: Vec<String>,
    pub emit_base_types: bool,
    pub output_dir: PathBuf,
    pub base_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            module_root: PathBuf::from("."),
            catalog: None,
            extra_scope: Vec::new(),
            preserve_comments: CommentPolicy::default(),
            enum_style: EnumStyle::default(),
            optional_type: OptionalType::default(),
            single_file: true,
            namespace_prefix_strip: Vec::new(),
            type_mappings: BTreeMap::new(),
            flavors: Vec::new(),
            emit_base_types: true,
            output_dir: PathBuf::from("generated"),
            base_name: "types".into(),
        }
    }
}

impl Config {
    /// Load an explicit config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the config for a project, falling back to the global file and
    /// then to defaults. Returns the file used, if any.
    pub fn discover(root: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let candidates = [
            Some(root.join("typebridge.toml")),
            Some(root.join(".typebridge").join("config.toml")),
            Self::global_config_path(),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return Ok((Self::load(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("typebridge").join("config.toml"))
    }

    /// Check cross-field constraints against the available flavors.
    pub fn validate(&self, registry: &FlavorRegistry) -> Result<(), ConfigError> {
        if self.base_name.is_empty() || self.base_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "base-name must be a plain file stem, got {:?}",
                self.base_name
            )));
        }
        let mut seen = BTreeSet::new();
        for name in &self.flavors {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!("flavor {:?} listed twice", name)));
            }
            if !registry.contains(name) {
                return Err(ConfigError::Invalid(format!(
                    "unknown flavor {:?} (available: {})",
                    name,
                    registry.names().join(", ")
                )));
            }
        }
        if !self.emit_base_types {
            let infers = self
                .flavors
                .iter()
                .filter_map(|n| registry.create(n))
                .any(|f| f.emits_inferred_types());
            if !infers {
                return Err(ConfigError::Invalid(
                    "emit-base-types = false needs a flavor that exports inferred types".into(),
                ));
            }
        }
        if self.provider == ProviderKind::Shallow && self.catalog.is_none() {
            return Err(ConfigError::Invalid(
                "provider = \"shallow\" needs a catalog path".into(),
            ));
        }
        self.type_mappings()?;
        Ok(())
    }

    pub fn type_mappings(&self) -> Result<TypeMappings, ConfigError> {
        TypeMappings::with_overrides(&self.type_mappings)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            enum_style: self.enum_style,
            optional_type: self.optional_type,
            comments: self.preserve_comments,
            single_file: self.single_file,
            namespace_prefix_strip: self.namespace_prefix_strip.clone(),
            emit_base_types: self.emit_base_types,
            base_name: self.base_name.clone(),
        }
    }
}

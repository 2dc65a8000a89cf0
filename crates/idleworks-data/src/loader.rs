//! Format detection (RON/JSON/TOML), deserialization, and name resolution
//! helpers used by the scene builder.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use idleworks_core::error::ConfigError;
use idleworks_core::registry::RegistryError;

// ===========================================================================
// Errors
// ===========================================================================

/// Everything that can go wrong between a scene file and a running engine.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("{file}: expected a .ron, .json or .toml file")]
    UnsupportedFormat { file: PathBuf },

    #[error("{file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A component names something the scene never declares.
    #[error("unresolved {expected_kind} reference '{name}'")]
    UnresolvedRef {
        name: String,
        expected_kind: &'static str,
    },

    #[error("{kind} '{name}' is declared twice")]
    DuplicateName { kind: &'static str, name: String },

    #[error("ticks_per_second must be positive")]
    ZeroTickRate,

    /// A number does not fit the engine's fixed-point range.
    #[error("{field}: {value} is out of range")]
    InvalidValue { field: String, value: f64 },

    /// The engine refused a component's configuration.
    #[error("invalid {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ron" => Some(Self::Ron),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Pick a format from the file extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// Deserialize `content` in the given format. `origin` names the source in
/// parse errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let detail = match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    };
    detail.map_err(|detail| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    })
}

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    deserialize_str(&text, format, path)
}

// ===========================================================================
// Names
// ===========================================================================

pub fn resolve_name<V: Copy>(
    names: &HashMap<String, V>,
    name: &str,
    expected_kind: &'static str,
) -> Result<V, DataLoadError> {
    match names.get(name) {
        Some(&v) => Ok(v),
        None => Err(DataLoadError::UnresolvedRef {
            name: name.to_owned(),
            expected_kind,
        }),
    }
}

/// Record `name`, failing if the scene already declared it for `kind`.
pub fn insert_unique<V>(
    names: &mut HashMap<String, V>,
    name: &str,
    kind: &'static str,
    value: V,
) -> Result<(), DataLoadError> {
    match names.entry(name.to_owned()) {
        Entry::Occupied(_) => Err(DataLoadError::DuplicateName {
            kind,
            name: name.to_owned(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

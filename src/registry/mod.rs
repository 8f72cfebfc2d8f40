// src/registry/mod.rs

//! Destination registry: the static map of rooms the presence may cover.
//!
//! Loaded once at startup from an already-resolved policy list (or the
//! daemon's TOML file) and read-only afterwards. Invalid policies are fatal;
//! the engine must not start with one.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("destination with empty id")]
    EmptyId,
    #[error("duplicate destination id '{0}'")]
    DuplicateId(String),
    #[error("destination '{id}' has non-positive cadence override ({cadence_ms} ms)")]
    NonPositiveCadence { id: String, cadence_ms: i64 },
    #[error("failed to read destination file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse destination file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-room policy, immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationPolicy {
    pub id: String,
    pub room_name: String,
    pub platform: String,

    /// Overrides the global default cadence for this room.
    #[serde(default)]
    pub cadence_override_ms: Option<i64>,

    /// Content-source tags the selection component may draw from for this
    /// room. Not consulted by any eligibility decision here.
    #[serde(default)]
    pub source_filter: Option<Vec<String>>,

    /// Default rendering style for this room. Passed through, never read.
    #[serde(default)]
    pub default_style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoomsFile {
    rooms: Vec<DestinationPolicy>,
}

/// Id-keyed view over the loaded policies.
pub struct DestinationRegistry {
    by_id: HashMap<String, DestinationPolicy>,
}

impl DestinationRegistry {
    /// Build the registry from an already-resolved policy list,
    /// rejecting anything the engine could not run with.
    pub fn load(policies: Vec<DestinationPolicy>) -> Result<Self, RegistryError> {
        let mut by_id = HashMap::with_capacity(policies.len());

        for policy in policies {
            if policy.id.trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if let Some(cadence_ms) = policy.cadence_override_ms {
                if cadence_ms <= 0 {
                    return Err(RegistryError::NonPositiveCadence {
                        id: policy.id,
                        cadence_ms,
                    });
                }
            }
            if by_id.contains_key(&policy.id) {
                return Err(RegistryError::DuplicateId(policy.id));
            }
            by_id.insert(policy.id.clone(), policy);
        }

        Ok(Self { by_id })
    }

    /// Load from the daemon's TOML destination file.
    pub fn from_toml_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: RoomsFile = toml::from_str(&raw).map_err(|source| RegistryError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let registry = Self::load(file.rooms)?;
        info!("Loaded {} destinations from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn get(&self, destination_id: &str) -> Option<&DestinationPolicy> {
        self.by_id.get(destination_id)
    }

    pub fn contains(&self, destination_id: &str) -> bool {
        self.by_id.contains_key(destination_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &DestinationPolicy> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

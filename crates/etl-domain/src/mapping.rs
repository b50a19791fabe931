use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// The scalar shape a mapped field's extracted value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
}

/// One catalog entry: how to produce a single target field from the raw
/// nested property bag. `sources` is tried in order, first non-null and
/// non-`"N/A"` value wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub target: String,
    pub sources: Vec<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default)]
    pub value_map: HashMap<String, String>,
    #[serde(default)]
    pub extract_regex: Option<String>,
    #[serde(default)]
    pub true_values: Vec<String>,
    #[serde(default)]
    pub false_values: Vec<String>,
    #[serde(default)]
    pub null_values: Vec<String>,
}

/// The loaded, validated mapping document: which raw keys feed which
/// target fields for each of the two output tables.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingCatalog {
    pub permanent: Vec<FieldMapping>,
    pub changeable: Vec<FieldMapping>,
    /// Union of every key referenced by any mapping's `sources`, plus the
    /// literal `EHR_ID`. Computed once at load time by [`MappingCatalog::known_keys`]
    /// and cached here so the transformer never recomputes it per record.
    #[serde(skip, default)]
    known_keys: HashSet<String>,
}

impl MappingCatalog {
    /// Builds a catalog from its two mapping lists, computing `known_keys`
    /// immediately. Mainly useful for tests and programmatic construction;
    /// catalogs loaded from a document go through `serde_yaml` + [`Self::finalize`].
    pub fn new(permanent: Vec<FieldMapping>, changeable: Vec<FieldMapping>) -> Self {
        Self { permanent, changeable, known_keys: HashSet::new() }.finalize()
    }

    /// Finalizes a deserialized document by computing `known_keys`. Does
    /// not validate; call [`Self::validate`] separately.
    pub fn finalize(mut self) -> Self {
        let mut keys: HashSet<String> = self
            .permanent
            .iter()
            .chain(self.changeable.iter())
            .flat_map(|m| m.sources.iter().cloned())
            .collect();
        keys.insert("EHR_ID".to_string());
        self.known_keys = keys;
        self
    }

    pub fn known_keys(&self) -> &HashSet<String> {
        &self.known_keys
    }

    pub fn all_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.permanent.iter().chain(self.changeable.iter())
    }
}

use serde::Serialize;

use vibes_common::ResourceKind;

/// One row of a resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRow {
    pub name: String,
    pub installed: bool,
    /// Registry the resource comes from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Local path, or `<skill>/<file>` inside the registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Everything known about one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDetail {
    pub kind: ResourceKind,
    pub name: String,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Inline instruction text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_to: Option<String>,
}

/// What an install or remove did, name by name. Produced even when some
/// names failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub mutated: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub skipped_missing: Vec<String>,
    pub errors: Vec<String>,
}

impl MutationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn missing(&mut self, kind: ResourceKind, name: &str, why: &str) {
        self.skipped_missing.push(name.to_string());
        self.errors.push(format!("{kind} '{name}' {why}"));
    }
}

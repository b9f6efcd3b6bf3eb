//! Manifest schema types (registries, skills, instructions, agents, targets).

use serde::{Deserialize, Serialize};

use vibes_common::{Error, ResourceKind, Result};

/// Literal `ref` value meaning "track the default branch".
pub const LATEST_REF: &str = "latest";

/// Name of the registry compiled into the binary. Always implicitly present.
pub const EMBEDDED_REGISTRY: &str = "embedded";

/// Root configuration document (`vibes.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<RegistryRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<SkillRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<InstructionRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

impl Manifest {
    /// `true` when the manifest declares no skills, instructions, or agents.
    #[must_use]
    pub fn has_no_resources(&self) -> bool {
        self.skills.is_empty() && self.instructions.is_empty() && self.agents.is_empty()
    }

    #[must_use]
    pub fn find_registry(&self, name: &str) -> Option<&RegistryRef> {
        self.registries.iter().find(|r| r.name == name)
    }

    /// Names declared for one resource kind, in manifest order.
    #[must_use]
    pub fn names(&self, kind: ResourceKind) -> Vec<&str> {
        match kind {
            ResourceKind::Skill => self.skills.iter().map(|s| s.name.as_str()).collect(),
            ResourceKind::Instruction => {
                self.instructions.iter().map(|i| i.name.as_str()).collect()
            },
            ResourceKind::Agent => self.agents.iter().map(|a| a.name.as_str()).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.names(kind).contains(&name)
    }

    /// Remove the entry `name` of `kind`. Returns whether anything was removed.
    pub fn remove(&mut self, kind: ResourceKind, name: &str) -> bool {
        let before = self.names(kind).len();
        match kind {
            ResourceKind::Skill => self.skills.retain(|s| s.name != name),
            ResourceKind::Instruction => self.instructions.retain(|i| i.name != name),
            ResourceKind::Agent => self.agents.retain(|a| a.name != name),
        }
        self.names(kind).len() != before
    }
}

/// Anything keyed by `name` within a manifest list.
pub trait Named {
    fn name(&self) -> &str;
}

// ── Registries ──────────────────────────────────────────────────────────────

/// A git repository serving skills, instructions, and agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRef {
    pub name: String,
    #[serde(default)]
    pub url: String,
    /// `latest`, a branch, a tag, or a 7-40 hex commit SHA. Required.
    #[serde(default, rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "RegistryPaths::is_empty")]
    pub paths: RegistryPaths,
}

impl RegistryRef {
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.reference == LATEST_REF
    }
}

impl Named for RegistryRef {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Per-kind subtrees inside the registry worktree. Missing entries mean the
/// repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<String>,
}

impl RegistryPaths {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_none() && self.instructions.is_none() && self.agents.is_none()
    }

    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Skill => self.skills.as_deref(),
            ResourceKind::Instruction => self.instructions.as_deref(),
            ResourceKind::Agent => self.agents.as_deref(),
        }
    }
}

// ── Skills ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Where a skill entry is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillSource<'a> {
    /// Fetch from a named registry; `path` overrides the in-repo directory.
    Registry {
        registry: &'a str,
        path: Option<&'a str>,
    },
    /// A local directory containing `SKILL.md`.
    LocalPath(&'a str),
    /// Search every registry for `name`.
    Search,
}

impl SkillRef {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn source(&self) -> SkillSource<'_> {
        match (self.registry.as_deref(), self.path.as_deref()) {
            (Some(registry), path) => SkillSource::Registry { registry, path },
            (None, Some(path)) => SkillSource::LocalPath(path),
            (None, None) => SkillSource::Search,
        }
    }
}

impl SkillSource<'_> {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registry { .. } => "registry",
            Self::LocalPath(_) => "path",
            Self::Search => "search",
        }
    }
}

impl Named for SkillRef {
    fn name(&self) -> &str {
        &self.name
    }
}

// ── Instructions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Restrict this instruction to a single target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_to: Option<String>,
}

/// Where an instruction's text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionSource<'a> {
    Inline(&'a str),
    LocalPath(&'a str),
    /// `inner_path` is `<skillName>/<relPath>` inside the registry.
    RegistryPath {
        registry: &'a str,
        inner_path: &'a str,
    },
}

impl InstructionRef {
    /// Classify the entry, enforcing content XOR path XOR registry+path.
    pub fn source(&self) -> Result<InstructionSource<'_>> {
        match (
            self.content.as_deref(),
            self.path.as_deref(),
            self.registry.as_deref(),
        ) {
            (Some(content), None, None) => Ok(InstructionSource::Inline(content)),
            (None, Some(path), None) => Ok(InstructionSource::LocalPath(path)),
            (None, Some(inner_path), Some(registry)) => Ok(InstructionSource::RegistryPath {
                registry,
                inner_path,
            }),
            (None, None, Some(_)) => Err(Error::validation(format!(
                "instruction '{}': registry requires a path",
                self.name
            ))),
            (None, None, None) => Err(Error::validation(format!(
                "instruction '{}': one of content, path, or registry+path is required",
                self.name
            ))),
            (Some(_), _, _) => Err(Error::validation(format!(
                "instruction '{}': content cannot be combined with path or registry",
                self.name
            ))),
        }
    }

    /// Whether this instruction should be written to `target`.
    #[must_use]
    pub fn applies_to(&self, target: &str) -> bool {
        self.apply_to.as_deref().is_none_or(|t| t == target)
    }
}

impl InstructionSource<'_> {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inline(_) => "content",
            Self::LocalPath(_) => "path",
            Self::RegistryPath { .. } => "registry",
        }
    }
}

impl Named for InstructionRef {
    fn name(&self) -> &str {
        &self.name
    }
}

// ── Agents ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

/// Where an agent file comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSource<'a> {
    LocalPath(&'a str),
    RegistryPath {
        registry: &'a str,
        inner_path: &'a str,
    },
}

impl AgentRef {
    /// Classify the entry, enforcing path XOR registry (registry form
    /// carries `<skillName>/<relPath>` in `path`).
    pub fn source(&self) -> Result<AgentSource<'_>> {
        match (self.path.as_deref(), self.registry.as_deref()) {
            (Some(path), None) => Ok(AgentSource::LocalPath(path)),
            (Some(inner_path), Some(registry)) => Ok(AgentSource::RegistryPath {
                registry,
                inner_path,
            }),
            (None, Some(_)) => Err(Error::validation(format!(
                "agent '{}': registry requires a path of the form <skill>/<file>",
                self.name
            ))),
            (None, None) => Err(Error::validation(format!(
                "agent '{}': one of path or registry is required",
                self.name
            ))),
        }
    }
}

impl AgentSource<'_> {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalPath(_) => "path",
            Self::RegistryPath { .. } => "registry",
        }
    }
}

impl Named for AgentRef {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Split a registry inner path `<skillName>/<relPath>`.
pub fn split_inner_path(inner_path: &str) -> Result<(&str, &str)> {
    inner_path
        .trim_start_matches("./")
        .split_once('/')
        .filter(|(skill, rel)| !skill.is_empty() && !rel.is_empty())
        .ok_or_else(|| {
            Error::validation(format!(
                "registry path '{inner_path}' must have the form <skill>/<file>"
            ))
        })
}

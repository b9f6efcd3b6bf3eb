//! Manifest validation.
//!
//! Checks a parsed manifest against the structural rules (valid targets,
//! pinned registries, exclusive instruction/agent sources) and detects
//! unknown or misspelled keys in the raw YAML.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use vibes_common::{Error, Result, TargetKind};

use crate::schema::{Manifest, Named};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "target", "registry", "source",
    /// "duplicate", "empty", "resolve", "portability", "override"
    pub category: &'static str,
    /// Dotted path, e.g. "skills.code-review"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn warning(
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a manifest.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Which layer a manifest belongs to. A global manifest may be empty; a
/// project manifest must declare something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestScope {
    Project,
    Global,
}

// ── Known keys ──────────────────────────────────────────────────────────────

const TOP_LEVEL_KEYS: &[&str] = &["registries", "skills", "instructions", "agents", "targets"];
const REGISTRY_KEYS: &[&str] = &["name", "url", "ref", "paths"];
const REGISTRY_PATH_KEYS: &[&str] = &["skills", "instructions", "agents"];
const SKILL_KEYS: &[&str] = &["name", "registry", "path", "version"];
const INSTRUCTION_KEYS: &[&str] = &["name", "content", "path", "registry", "apply_to"];
const AGENT_KEYS: &[&str] = &["name", "path", "registry"];

// ── Levenshtein distance for suggestions ────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb {
                0
            } else {
                1
            };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

fn with_hint(message: String, hint: Option<&str>) -> String {
    match hint {
        Some(h) => format!("{message} (did you mean \"{h}\"?)"),
        None => message,
    }
}

// ── Structural checks ───────────────────────────────────────────────────────

/// Diagnostic for an unrecognized target identifier, if `target` is unknown.
#[must_use]
pub fn check_target(path: impl Into<String>, target: &str) -> Option<Diagnostic> {
    if TargetKind::is_valid(target) {
        return None;
    }
    let names = TargetKind::names();
    let message = with_hint(
        format!(
            "unknown target \"{target}\" (expected one of: {})",
            names.join(", ")
        ),
        suggest(target, &names, 3),
    );
    Some(Diagnostic::error("target", path, message))
}

/// Run every structural rule over `manifest` and return all findings.
#[must_use]
pub fn check_manifest(manifest: &Manifest, scope: ManifestScope) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if scope == ManifestScope::Project && manifest.has_no_resources() && manifest.targets.is_empty()
    {
        out.push(Diagnostic::error(
            "empty",
            "",
            "manifest declares no skills, instructions, agents, or targets",
        ));
    }

    for (i, target) in manifest.targets.iter().enumerate() {
        out.extend(check_target(format!("targets[{i}]"), target));
    }

    for (i, registry) in manifest.registries.iter().enumerate() {
        let path = format!("registries[{i}]");
        if registry.name.trim().is_empty() {
            out.push(Diagnostic::error("registry", &path, "registry name is empty"));
        }
        if registry.url.trim().is_empty() {
            out.push(Diagnostic::error(
                "registry",
                &path,
                format!("registry '{}' has no url", registry.name),
            ));
        }
        if registry.reference.trim().is_empty() {
            out.push(Diagnostic::error(
                "registry",
                &path,
                format!(
                    "registry '{}' has an empty ref (use \"latest\" to track the default branch)",
                    registry.name
                ),
            ));
        }
    }
    check_duplicates("registries", &manifest.registries, &mut out);

    for skill in &manifest.skills {
        if skill.name.trim().is_empty() {
            out.push(Diagnostic::error("empty", "skills", "skill name is empty"));
        }
    }
    check_duplicates("skills", &manifest.skills, &mut out);

    for instruction in &manifest.instructions {
        let path = format!("instructions.{}", instruction.name);
        if instruction.name.trim().is_empty() {
            out.push(Diagnostic::error("empty", "instructions", "instruction name is empty"));
        }
        if let Err(e) = instruction.source() {
            out.push(Diagnostic::error("source", &path, e.to_string()));
        }
        if let Some(target) = instruction.apply_to.as_deref() {
            out.extend(check_target(format!("{path}.apply_to"), target));
        }
    }
    check_duplicates("instructions", &manifest.instructions, &mut out);

    for agent in &manifest.agents {
        if agent.name.trim().is_empty() {
            out.push(Diagnostic::error("empty", "agents", "agent name is empty"));
        }
        if let Err(e) = agent.source() {
            out.push(Diagnostic::error(
                "source",
                format!("agents.{}", agent.name),
                e.to_string(),
            ));
        }
    }
    check_duplicates("agents", &manifest.agents, &mut out);

    out
}

fn check_duplicates<T: Named>(section: &str, entries: &[T], out: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.name()) {
            out.push(Diagnostic::error(
                "duplicate",
                format!("{section}.{}", entry.name()),
                format!("'{}' is declared more than once in {section}", entry.name()),
            ));
        }
    }
}

/// Validate `manifest`, failing with a validation error that lists every
/// structural problem found.
pub fn validate_manifest(manifest: &Manifest, scope: ManifestScope) -> Result<()> {
    let errors: Vec<String> = check_manifest(manifest, scope)
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(errors.join("; ")))
    }
}

// ── Unknown-field detection ─────────────────────────────────────────────────

/// Walk raw YAML and flag keys the schema does not know about.
#[must_use]
pub fn check_unknown_fields(raw: &serde_yaml::Value) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let Some(top) = raw.as_mapping() else {
        if !raw.is_null() {
            out.push(Diagnostic::error(
                "syntax",
                "",
                "manifest root must be a mapping",
            ));
        }
        return out;
    };

    check_keys(top, TOP_LEVEL_KEYS, "", &mut out);

    let sections: [(&str, &[&str]); 4] = [
        ("registries", REGISTRY_KEYS),
        ("skills", SKILL_KEYS),
        ("instructions", INSTRUCTION_KEYS),
        ("agents", AGENT_KEYS),
    ];
    for (section, keys) in sections {
        let Some(items) = top.get(section).and_then(|v| v.as_sequence()) else {
            continue;
        };
        for (i, item) in items.iter().enumerate() {
            let Some(map) = item.as_mapping() else {
                continue;
            };
            let prefix = format!("{section}[{i}]");
            check_keys(map, keys, &prefix, &mut out);
            if section == "registries"
                && let Some(paths) = map.get("paths").and_then(|v| v.as_mapping())
            {
                check_keys(paths, REGISTRY_PATH_KEYS, &format!("{prefix}.paths"), &mut out);
            }
        }
    }
    out
}

fn check_keys(map: &serde_yaml::Mapping, known: &[&str], prefix: &str, out: &mut Vec<Diagnostic>) {
    for key in map.keys() {
        let Some(key) = key.as_str() else {
            continue;
        };
        if known.contains(&key) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        let message = with_hint(format!("unknown field \"{key}\""), suggest(key, known, 3));
        out.push(Diagnostic::warning("unknown-field", path, message));
    }
}

/// Validate a manifest file on disk: syntax, unknown keys, then structure.
#[must_use]
pub fn validate_file(path: &Path, scope: ManifestScope) -> ValidationResult {
    let mut result = ValidationResult {
        diagnostics: Vec::new(),
        config_path: Some(path.to_path_buf()),
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            result.diagnostics.push(Diagnostic::error(
                "syntax",
                "",
                format!("cannot read {}: {e}", path.display()),
            ));
            return result;
        },
    };
    if raw.trim().is_empty() {
        result.diagnostics.extend(check_manifest(&Manifest::default(), scope));
        return result;
    }

    let value: serde_yaml::Value = match serde_yaml::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            result
                .diagnostics
                .push(Diagnostic::error("syntax", "", e.to_string()));
            return result;
        },
    };
    result.diagnostics.extend(check_unknown_fields(&value));

    match serde_yaml::from_value::<Manifest>(value) {
        Ok(manifest) => result.diagnostics.extend(check_manifest(&manifest, scope)),
        Err(e) => result
            .diagnostics
            .push(Diagnostic::error("syntax", "", e.to_string())),
    }
    result
}

//! Layer diffs and override diagnostics between the global and project
//! manifests.

use serde::Serialize;

use vibes_common::ResourceKind;

use crate::schema::{Manifest, Named};

/// A name declared in both layers whose source type changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskyOverride {
    pub kind: ResourceKind,
    pub name: String,
    /// Source label in the global layer ("registry", "path", "content", ...).
    pub from: &'static str,
    /// Source label in the local layer.
    pub to: &'static str,
}

impl std::fmt::Display for RiskyOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' switches source from {} (global) to {} (local)",
            self.kind, self.name, self.from, self.to
        )
    }
}

/// Names present in both layers, per kind, plus the risky subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideReport {
    pub skills: Vec<String>,
    pub instructions: Vec<String>,
    pub agents: Vec<String>,
    pub risky: Vec<RiskyOverride>,
}

impl OverrideReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.instructions.is_empty() && self.agents.is_empty()
    }

    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> &[String] {
        match kind {
            ResourceKind::Skill => &self.skills,
            ResourceKind::Instruction => &self.instructions,
            ResourceKind::Agent => &self.agents,
        }
    }
}

fn instruction_label(r: &crate::schema::InstructionRef) -> &'static str {
    r.source().map(|s| s.label()).unwrap_or("invalid")
}

fn agent_label(r: &crate::schema::AgentRef) -> &'static str {
    r.source().map(|s| s.label()).unwrap_or("invalid")
}

fn overrides_of<T: Named>(
    kind: ResourceKind,
    global: &[T],
    local: &[T],
    label: impl Fn(&T) -> &'static str,
    risky: &mut Vec<RiskyOverride>,
) -> Vec<String> {
    let mut names = Vec::new();
    for l in local {
        let Some(g) = global.iter().find(|g| g.name() == l.name()) else {
            continue;
        };
        names.push(l.name().to_string());
        let (from, to) = (label(g), label(l));
        if from != to {
            risky.push(RiskyOverride {
                kind,
                name: l.name().to_string(),
                from,
                to,
            });
        }
    }
    names
}

/// Names declared in both layers, and those whose source type changes.
#[must_use]
pub fn compute_overrides(global: &Manifest, local: &Manifest) -> OverrideReport {
    let mut risky = Vec::new();
    let skills = overrides_of(
        ResourceKind::Skill,
        &global.skills,
        &local.skills,
        |s| s.source().label(),
        &mut risky,
    );
    let instructions = overrides_of(
        ResourceKind::Instruction,
        &global.instructions,
        &local.instructions,
        instruction_label,
        &mut risky,
    );
    let agents = overrides_of(
        ResourceKind::Agent,
        &global.agents,
        &local.agents,
        agent_label,
        &mut risky,
    );
    OverrideReport {
        skills,
        instructions,
        agents,
        risky,
    }
}

// ── Layer diff ──────────────────────────────────────────────────────────────

/// Three buckets for one section plus the merged count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionDiff {
    pub global_only: Vec<String>,
    pub local_only: Vec<String>,
    pub overrides: Vec<String>,
    pub effective: usize,
}

impl SectionDiff {
    fn compute<T: Named>(global: &[T], local: &[T], merged: &[T]) -> Self {
        let has = |list: &[T], name: &str| list.iter().any(|e| e.name() == name);
        let global_only = global
            .iter()
            .filter(|g| !has(local, g.name()))
            .map(|g| g.name().to_string())
            .collect();
        let mut local_only = Vec::new();
        let mut overrides = Vec::new();
        for l in local {
            if has(global, l.name()) {
                overrides.push(l.name().to_string());
            } else {
                local_only.push(l.name().to_string());
            }
        }
        Self {
            global_only,
            local_only,
            overrides,
            effective: merged.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetsDiff {
    pub global: Vec<String>,
    pub local: Vec<String>,
    pub effective: Vec<String>,
}

/// Per-section comparison of the two layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    pub registries: SectionDiff,
    pub skills: SectionDiff,
    pub instructions: SectionDiff,
    pub agents: SectionDiff,
    pub targets: TargetsDiff,
    pub risky: Vec<RiskyOverride>,
}

impl ConfigDiff {
    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> &SectionDiff {
        match kind {
            ResourceKind::Skill => &self.skills,
            ResourceKind::Instruction => &self.instructions,
            ResourceKind::Agent => &self.agents,
        }
    }
}

#[must_use]
pub fn diff_manifests(global: &Manifest, local: &Manifest, merged: &Manifest) -> ConfigDiff {
    ConfigDiff {
        registries: SectionDiff::compute(&global.registries, &local.registries, &merged.registries),
        skills: SectionDiff::compute(&global.skills, &local.skills, &merged.skills),
        instructions: SectionDiff::compute(
            &global.instructions,
            &local.instructions,
            &merged.instructions,
        ),
        agents: SectionDiff::compute(&global.agents, &local.agents, &merged.agents),
        targets: TargetsDiff {
            global: global.targets.clone(),
            local: local.targets.clone(),
            effective: merged.targets.clone(),
        },
        risky: compute_overrides(global, local).risky,
    }
}

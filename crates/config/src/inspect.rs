//! Inspection of a merged configuration for operator feedback.

use std::path::Path;

use crate::{
    diff::compute_overrides,
    loader::Layers,
    schema::{AgentSource, EMBEDDED_REGISTRY, InstructionSource, Manifest, SkillSource},
    validate::{Diagnostic, Severity, ValidationResult, check_target},
};

fn registry_known(merged: &Manifest, registry: &str) -> bool {
    registry == EMBEDDED_REGISTRY || merged.find_registry(registry).is_some()
}

fn unresolved(path: String, message: String) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        category: "resolve",
        path,
        message,
    }
}

/// Check that every merged entry can be resolved and flag portability and
/// override risks. `embedded_skills` lists the names compiled into the
/// binary.
#[must_use]
pub fn inspect(layers: &Layers, embedded_skills: &[&str]) -> ValidationResult {
    let merged = &layers.merged;
    let mut diagnostics = Vec::new();

    for (i, target) in merged.targets.iter().enumerate() {
        diagnostics.extend(check_target(format!("targets[{i}]"), target));
    }

    let has_git_registries = !merged.registries.is_empty();
    for skill in &merged.skills {
        let path = format!("skills.{}", skill.name);
        match skill.source() {
            SkillSource::Registry { registry, .. } if !registry_known(merged, registry) => {
                diagnostics.push(unresolved(
                    path,
                    format!("skill '{}' references undeclared registry '{registry}'", skill.name),
                ));
            },
            SkillSource::Registry { .. } => {},
            SkillSource::LocalPath(dir) => {
                if !Path::new(dir).join(vibes_skills::SKILL_FILE).is_file() {
                    diagnostics.push(unresolved(
                        path,
                        format!("skill '{}': no SKILL.md under {dir}", skill.name),
                    ));
                }
            },
            SkillSource::Search if embedded_skills.contains(&skill.name.as_str()) => {},
            SkillSource::Search if has_git_registries => diagnostics.push(Diagnostic {
                severity: Severity::Info,
                category: "resolve",
                path,
                message: format!(
                    "skill '{}' is not embedded; it will be looked up in the configured registries",
                    skill.name
                ),
            }),
            SkillSource::Search => diagnostics.push(unresolved(
                path,
                format!(
                    "skill '{}' is not embedded and no registries are configured",
                    skill.name
                ),
            )),
        }
    }

    for instruction in &merged.instructions {
        let path = format!("instructions.{}", instruction.name);
        match instruction.source() {
            Err(e) => diagnostics.push(unresolved(path.clone(), e.to_string())),
            Ok(InstructionSource::Inline(_)) => {},
            Ok(InstructionSource::LocalPath(file)) => {
                if !Path::new(file).is_file() {
                    diagnostics.push(unresolved(
                        path.clone(),
                        format!("instruction '{}': {file} does not exist", instruction.name),
                    ));
                }
            },
            Ok(InstructionSource::RegistryPath { registry, .. }) => {
                if !registry_known(merged, registry) {
                    diagnostics.push(unresolved(
                        path.clone(),
                        format!(
                            "instruction '{}' references undeclared registry '{registry}'",
                            instruction.name
                        ),
                    ));
                }
            },
        }
        if let Some(target) = instruction.apply_to.as_deref() {
            diagnostics.extend(check_target(format!("{path}.apply_to"), target));
        }
    }

    for agent in &merged.agents {
        let path = format!("agents.{}", agent.name);
        match agent.source() {
            Err(e) => diagnostics.push(unresolved(path, e.to_string())),
            Ok(AgentSource::LocalPath(file)) => {
                if !Path::new(file).is_file() {
                    diagnostics.push(unresolved(
                        path,
                        format!("agent '{}': {file} does not exist", agent.name),
                    ));
                }
            },
            Ok(AgentSource::RegistryPath { registry, .. }) => {
                if !registry_known(merged, registry) {
                    diagnostics.push(unresolved(
                        path,
                        format!(
                            "agent '{}' references undeclared registry '{registry}'",
                            agent.name
                        ),
                    ));
                }
            },
        }
    }

    if let (Some(global), Some(local)) = (&layers.global, &layers.local) {
        diagnostics.extend(portability_warnings(global, local));
        diagnostics.extend(compute_overrides(global, local).risky.into_iter().map(|r| {
            Diagnostic::warning(
                "override",
                format!("{}.{}", r.kind.plural(), r.name),
                r.to_string(),
            )
        }));
    }

    ValidationResult {
        diagnostics,
        config_path: layers.local_path.clone().or_else(|| layers.global_path.clone()),
    }
}

/// Local entries that name a registry only the global layer declares. Such
/// a project manifest breaks on machines without the same global config.
fn portability_warnings(global: &Manifest, local: &Manifest) -> Vec<Diagnostic> {
    let global_only = |registry: &str| {
        registry != EMBEDDED_REGISTRY
            && local.find_registry(registry).is_none()
            && global.find_registry(registry).is_some()
    };

    let skills = local
        .skills
        .iter()
        .filter_map(|s| Some(("skills", s.name.as_str(), s.registry.as_deref()?)));
    let instructions = local
        .instructions
        .iter()
        .filter_map(|i| Some(("instructions", i.name.as_str(), i.registry.as_deref()?)));
    let agents = local
        .agents
        .iter()
        .filter_map(|a| Some(("agents", a.name.as_str(), a.registry.as_deref()?)));

    skills
        .chain(instructions)
        .chain(agents)
        .filter(|(_, _, registry)| global_only(registry))
        .map(|(section, name, registry)| {
            Diagnostic::warning(
                "portability",
                format!("{section}.{name}"),
                format!(
                    "'{name}' uses registry '{registry}', which is only defined in the global \
                     manifest"
                ),
            )
        })
        .collect()
}

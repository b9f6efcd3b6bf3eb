//! Global + local manifest layering.

use crate::schema::{Manifest, Named};

/// Merge the global layer under the local one.
///
/// Resources and registries merge by name: global entries come first, a
/// local entry with the same name replaces the global one in place, and new
/// local entries are appended in local order. The same rule applies within
/// a layer, so the last declaration of a repeated name wins and every name
/// appears once. Targets are taken from the local manifest when it lists
/// any, otherwise from the global one, without repeats.
#[must_use]
pub fn merge_manifests(global: Option<&Manifest>, local: Option<&Manifest>) -> Manifest {
    let layers: Vec<&Manifest> = global.into_iter().chain(local).collect();
    let targets = local
        .filter(|l| !l.targets.is_empty())
        .or(global)
        .map(|m| m.targets.as_slice())
        .unwrap_or_default();

    Manifest {
        registries: merge_by_name(&layers, |m| m.registries.as_slice()),
        skills: merge_by_name(&layers, |m| m.skills.as_slice()),
        instructions: merge_by_name(&layers, |m| m.instructions.as_slice()),
        agents: merge_by_name(&layers, |m| m.agents.as_slice()),
        targets: unique(targets),
    }
}

fn merge_by_name<T, F>(layers: &[&Manifest], section: F) -> Vec<T>
where
    T: Named + Clone,
    F: Fn(&Manifest) -> &[T],
{
    let mut merged: Vec<T> = Vec::new();
    for entry in layers.iter().flat_map(|m| section(*m)) {
        match merged.iter_mut().find(|m| m.name() == entry.name()) {
            Some(slot) => *slot = entry.clone(),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

fn unique(targets: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(targets.len());
    for target in targets {
        if !out.contains(target) {
            out.push(target.clone());
        }
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{InstructionRef, RegistryRef, SkillRef},
    };

    fn registry(name: &str, reference: &str) -> RegistryRef {
        RegistryRef {
            name: name.into(),
            url: format!("https://example.com/{name}.git"),
            reference: reference.into(),
            paths: Default::default(),
        }
    }

    #[test]
    fn local_overrides_by_name_and_keeps_global_position() {
        let global = Manifest {
            skills: vec![SkillRef::named("a"), SkillRef::named("b")],
            ..Default::default()
        };
        let local = Manifest {
            skills: vec![
                SkillRef {
                    name: "b".into(),
                    path: Some("/local/b".into()),
                    ..Default::default()
                },
                SkillRef::named("c"),
            ],
            ..Default::default()
        };

        let merged = merge_manifests(Some(&global), Some(&local));
        let names: Vec<&str> = merged.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.skills[1].path.as_deref(), Some("/local/b"));
    }

    #[test]
    fn registries_merge_by_name() {
        let global = Manifest {
            registries: vec![registry("r1", "latest"), registry("r2", "latest")],
            ..Default::default()
        };
        let local = Manifest {
            registries: vec![registry("r2", "v1.0.0")],
            ..Default::default()
        };
        let merged = merge_manifests(Some(&global), Some(&local));
        assert_eq!(merged.registries.len(), 2);
        assert_eq!(merged.find_registry("r2").unwrap().reference, "v1.0.0");
    }

    #[test]
    fn instructions_merge_by_name() {
        let global = Manifest {
            instructions: vec![InstructionRef {
                name: "style".into(),
                content: Some("global".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let local = Manifest {
            instructions: vec![InstructionRef {
                name: "style".into(),
                content: Some("local".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let merged = merge_manifests(Some(&global), Some(&local));
        assert_eq!(merged.instructions.len(), 1);
        assert_eq!(merged.instructions[0].content.as_deref(), Some("local"));
    }

    #[test]
    fn targets_local_wins_when_non_empty() {
        let global = Manifest {
            targets: vec!["cursor".into()],
            ..Default::default()
        };
        let empty_local = Manifest::default();
        assert_eq!(
            merge_manifests(Some(&global), Some(&empty_local)).targets,
            vec!["cursor"]
        );

        let local = Manifest {
            targets: vec!["opencode".into()],
            ..Default::default()
        };
        assert_eq!(
            merge_manifests(Some(&global), Some(&local)).targets,
            vec!["opencode"]
        );
    }

    #[test]
    fn repeated_names_collapse_to_the_last_declaration() {
        let global = Manifest {
            skills: vec![
                SkillRef::named("a"),
                SkillRef {
                    name: "a".into(),
                    path: Some("/global/a".into()),
                    ..Default::default()
                },
            ],
            targets: vec!["cursor".into(), "cursor".into()],
            ..Default::default()
        };
        let local = Manifest {
            skills: vec![SkillRef::named("b")],
            ..Default::default()
        };

        let both = merge_manifests(Some(&global), Some(&local));
        let names: Vec<&str> = both.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(both.skills[0].path.as_deref(), Some("/global/a"));
        assert_eq!(both.targets, vec!["cursor"]);

        let only = merge_manifests(Some(&global), None);
        assert_eq!(only.skills.len(), 1);
        assert_eq!(only.skills[0].path.as_deref(), Some("/global/a"));
        assert_eq!(merge_manifests(None, Some(&global)).skills.len(), 1);
    }

    #[test]
    fn single_layer_passes_through() {
        let only = Manifest {
            skills: vec![SkillRef::named("a")],
            ..Default::default()
        };
        assert_eq!(merge_manifests(None, Some(&only)), only);
        assert_eq!(merge_manifests(Some(&only), None), only);
        assert_eq!(merge_manifests(None, None), Manifest::default());
    }
}

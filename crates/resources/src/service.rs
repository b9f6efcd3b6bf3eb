use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use {
    vibes_common::{Error, ResourceKind, Result},
    vibes_config::{
        AgentRef, InstructionRef, Layers, Manifest, SkillRef, SkillSource, load_manifest,
        load_merged, project_manifest_path, read_header, save_manifest,
    },
    vibes_registry::RegistrySet,
    vibes_skills::{SKILL_FILE, load_skill_dir},
};

use crate::report::{MutationReport, ResourceDetail, ResourceRow};

/// Which manifest `install` and `remove` edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    Local,
    Global,
}

/// Uniform list/show/install/remove over skills, instructions, and agents.
#[derive(Debug, Clone)]
pub struct ResourceService {
    project_dir: PathBuf,
    global_path: Option<PathBuf>,
    cache_root: PathBuf,
    scope: Scope,
}

impl ResourceService {
    #[must_use]
    pub fn new(project_dir: PathBuf, global_path: Option<PathBuf>, cache_root: PathBuf) -> Self {
        Self {
            project_dir,
            global_path,
            cache_root,
            scope: Scope::Local,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Both layers merged; empty when neither manifest exists yet.
    fn layers(&self) -> Result<Layers> {
        match load_merged(&self.project_dir, self.global_path.as_deref()) {
            Err(e) if e.is_not_found() => Ok(Layers::default()),
            other => other,
        }
    }

    fn registries(&self, merged: &Manifest) -> Result<RegistrySet> {
        RegistrySet::from_manifest(merged, &self.cache_root)
    }

    /// The manifest file mutations go to.
    fn target_path(&self) -> Result<PathBuf> {
        match self.scope {
            Scope::Local => Ok(project_manifest_path(&self.project_dir)),
            Scope::Global => self
                .global_path
                .clone()
                .ok_or_else(|| Error::validation("no global manifest path is configured")),
        }
    }

    /// Every resource of `kind` the registries offer, deduplicated by name
    /// in registry order.
    pub async fn list_available(&self, kind: ResourceKind) -> Result<Vec<ResourceRow>> {
        let layers = self.layers()?;
        let registries = self.registries(&layers.merged)?;
        let installed: HashSet<&str> = layers.merged.names(kind).into_iter().collect();
        Ok(available(kind, &registries)
            .await
            .into_iter()
            .map(|mut row| {
                row.installed = installed.contains(row.name.as_str());
                row
            })
            .collect())
    }

    /// Entries of `kind` in the merged manifest.
    pub fn list_installed(&self, kind: ResourceKind) -> Result<Vec<ResourceRow>> {
        let merged = self.layers()?.merged;
        let rows = match kind {
            ResourceKind::Skill => merged
                .skills
                .iter()
                .map(|s| installed_row(&s.name, s.registry.as_deref(), s.path.as_deref()))
                .collect(),
            ResourceKind::Instruction => merged
                .instructions
                .iter()
                .map(|i| installed_row(&i.name, i.registry.as_deref(), i.path.as_deref()))
                .collect(),
            ResourceKind::Agent => merged
                .agents
                .iter()
                .map(|a| installed_row(&a.name, a.registry.as_deref(), a.path.as_deref()))
                .collect(),
        };
        Ok(rows)
    }

    /// Detail for `name`, from the manifest if declared there, otherwise
    /// from the registries. Not-found when neither knows it.
    pub async fn show(&self, kind: ResourceKind, name: &str) -> Result<ResourceDetail> {
        let layers = self.layers()?;
        let merged = &layers.merged;
        let registries = self.registries(merged)?;

        let mut detail = ResourceDetail {
            kind,
            name: name.to_string(),
            installed: merged.contains(kind, name),
            registry: None,
            path: None,
            description: None,
            version: None,
            content: None,
            apply_to: None,
        };

        match kind {
            ResourceKind::Skill => {
                let declared = merged.skills.iter().find(|s| s.name == name);
                if let Some(skill) = declared {
                    detail.registry = skill.registry.clone();
                    detail.path = skill.path.clone();
                }
                let fetched = match declared.map(SkillRef::source) {
                    Some(SkillSource::LocalPath(path)) => {
                        load_skill_dir(&self.project_dir.join(path)).map(|skill| (None, skill))
                    },
                    Some(SkillSource::Registry { registry, path }) => {
                        match registries.get(registry) {
                            Some(r) => r
                                .fetch(path.unwrap_or(name))
                                .await
                                .map(|f| (Some(registry.to_string()), f.skill)),
                            None => Err(Error::not_found("registry", registry)),
                        }
                    },
                    Some(SkillSource::Search) | None => registries
                        .find_skill(name)
                        .await
                        .map(|(registry, f)| (Some(registry), f.skill)),
                };
                match fetched {
                    Ok((registry, skill)) => {
                        if detail.registry.is_none() {
                            detail.registry = registry;
                        }
                        detail.description = Some(skill.description).filter(|d| !d.is_empty());
                        detail.version = skill.version;
                    },
                    Err(e) if declared.is_some() => {
                        warn!(skill = name, error = %e, "failed to load skill details");
                    },
                    Err(e) => return Err(e),
                }
                return Ok(detail);
            },
            ResourceKind::Instruction => {
                if let Some(i) = merged.instructions.iter().find(|i| i.name == name) {
                    detail.registry = i.registry.clone();
                    detail.path = i.path.clone();
                    detail.content = i.content.clone();
                    detail.apply_to = i.apply_to.clone();
                    return Ok(detail);
                }
            },
            ResourceKind::Agent => {
                if let Some(a) = merged.agents.iter().find(|a| a.name == name) {
                    detail.registry = a.registry.clone();
                    detail.path = a.path.clone();
                    return Ok(detail);
                }
            },
        }

        if let Some(row) = available(kind, &registries)
            .await
            .into_iter()
            .find(|r| r.name == name)
        {
            detail.registry = row.registry;
            detail.path = row.path;
            return Ok(detail);
        }
        Err(Error::not_found(kind.as_str(), name))
    }

    /// Add `names` to the manifest. Names are deduplicated keeping the first
    /// occurrence; names already declared count as duplicates.
    ///
    /// Skills prefer a project-local `./skills/<name>/SKILL.md`, otherwise
    /// they must exist in some registry. Instructions and agents copy the
    /// registry location when a registry offers them, otherwise a
    /// conventional `./instructions/<name>.md` / `./agents/<name>.md` path is
    /// recorded.
    pub async fn install(&self, kind: ResourceKind, names: &[String]) -> Result<MutationReport> {
        let layers = self.layers()?;
        let registries = self.registries(&layers.merged)?;
        let path = self.target_path()?;
        let header = read_header(&path);
        let mut manifest = if path.is_file() {
            load_manifest(&path)?
        } else {
            Manifest::default()
        };

        let mut report = MutationReport::default();
        let mut seen = HashSet::new();
        let offered = match kind {
            ResourceKind::Skill => Vec::new(),
            _ => available(kind, &registries).await,
        };

        for name in names {
            if !seen.insert(name.as_str()) || manifest.contains(kind, name) {
                report.skipped_duplicates.push(name.clone());
                continue;
            }
            if name.trim().is_empty() {
                report.missing(kind, name, "has an empty name");
                continue;
            }

            match kind {
                ResourceKind::Skill => {
                    let Some(entry) = self.skill_entry(name, &registries, &mut report).await else {
                        continue;
                    };
                    manifest.skills.push(entry);
                },
                ResourceKind::Instruction => {
                    let (registry, path) = registry_location(&offered, name)
                        .unwrap_or_else(|| (None, self.conventional_path("instructions", name)));
                    manifest.instructions.push(InstructionRef {
                        name: name.clone(),
                        registry,
                        path: Some(path),
                        ..Default::default()
                    });
                },
                ResourceKind::Agent => {
                    let (registry, path) = registry_location(&offered, name)
                        .unwrap_or_else(|| (None, self.conventional_path("agents", name)));
                    manifest.agents.push(AgentRef {
                        name: name.clone(),
                        path: Some(path),
                        registry,
                    });
                },
            }
            report.mutated.push(name.clone());
        }

        if !report.mutated.is_empty() {
            save_manifest(&manifest, &path, header.as_deref())?;
            debug!(%kind, names = ?report.mutated, path = %path.display(), "installed resources");
        }
        Ok(report)
    }

    /// Drop `names` from the manifest. Missing names are reported; the rest
    /// are still removed.
    pub fn remove(&self, kind: ResourceKind, names: &[String]) -> Result<MutationReport> {
        let path = self.target_path()?;
        if !path.is_file() {
            return Err(Error::not_found("manifest", path.display().to_string()));
        }
        let header = read_header(&path);
        let mut manifest = load_manifest(&path)?;

        let mut report = MutationReport::default();
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                report.skipped_duplicates.push(name.clone());
            } else if manifest.remove(kind, name) {
                report.mutated.push(name.clone());
            } else {
                report.missing(kind, name, "is not in the manifest");
            }
        }

        if !report.mutated.is_empty() {
            save_manifest(&manifest, &path, header.as_deref())?;
            debug!(%kind, names = ?report.mutated, path = %path.display(), "removed resources");
        }
        Ok(report)
    }

    async fn skill_entry(
        &self,
        name: &str,
        registries: &RegistrySet,
        report: &mut MutationReport,
    ) -> Option<SkillRef> {
        let local_dir = self.project_dir.join("skills").join(name);
        if local_dir.join(SKILL_FILE).is_file() {
            return Some(SkillRef {
                name: name.to_string(),
                path: Some(self.conventional_dir("skills", name)),
                ..Default::default()
            });
        }
        match registries.find_skill(name).await {
            Ok((registry, _)) => {
                debug!(skill = name, registry = %registry, "skill available in registry");
                Some(SkillRef::named(name))
            },
            Err(e) if e.is_not_found() => {
                report.missing(
                    ResourceKind::Skill,
                    name,
                    "was not found locally or in any registry",
                );
                None
            },
            Err(e) => {
                report.skipped_missing.push(name.to_string());
                report.errors.push(e.to_string());
                None
            },
        }
    }

    /// `./<dir>/<name>` for the project manifest. The global manifest
    /// resolves paths against its own directory, so it gets an absolute
    /// path instead.
    fn conventional_dir(&self, dir: &str, name: &str) -> String {
        match self.scope {
            Scope::Local => format!("./{dir}/{name}"),
            Scope::Global => absolute(&self.project_dir.join(dir).join(name)),
        }
    }

    fn conventional_path(&self, dir: &str, name: &str) -> String {
        self.conventional_dir(dir, &format!("{name}.md"))
    }
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn installed_row(name: &str, registry: Option<&str>, path: Option<&str>) -> ResourceRow {
    ResourceRow {
        name: name.to_string(),
        installed: true,
        registry: registry.map(String::from),
        path: path.map(String::from),
    }
}

fn registry_location(rows: &[ResourceRow], name: &str) -> Option<(Option<String>, String)> {
    rows.iter()
        .find(|r| r.name == name)
        .and_then(|r| Some((r.registry.clone(), r.path.clone()?)))
}

/// Resource name for a file listed under a kind's base directory, if the
/// file is a resource of that kind.
///
/// `*.instructions.md` and `*.agent.md` always count. Plain `*.md` files
/// count only when the registry configures a dedicated base directory for
/// the kind, since the repository root holds every kind at once.
pub(crate) fn resource_name(
    kind: ResourceKind,
    file: &str,
    has_dedicated_root: bool,
) -> Option<&str> {
    let file_name = file.rsplit('/').next().unwrap_or(file);
    if matches!(file_name, "SKILL.md" | "README.md") {
        return None;
    }
    let typed_suffix = match kind {
        ResourceKind::Instruction => ".instructions.md",
        ResourceKind::Agent => ".agent.md",
        ResourceKind::Skill => return None,
    };
    file_name
        .strip_suffix(typed_suffix)
        .or_else(|| {
            has_dedicated_root
                .then(|| file_name.strip_suffix(".md"))
                .flatten()
        })
        .filter(|n| !n.is_empty())
}

fn push_row(rows: &mut Vec<ResourceRow>, name: &str, registry: &str, path: Option<String>) {
    if !rows.iter().any(|r| r.name == name) {
        rows.push(ResourceRow {
            name: name.to_string(),
            installed: false,
            registry: Some(registry.to_string()),
            path,
        });
    }
}

/// Rows (not yet marked installed) for everything the registries offer.
async fn available(kind: ResourceKind, registries: &RegistrySet) -> Vec<ResourceRow> {
    let mut rows: Vec<ResourceRow> = Vec::new();
    for registry in registries.iter() {
        match kind {
            ResourceKind::Skill => match registry.list().await {
                Ok(names) => {
                    for name in names {
                        push_row(&mut rows, &name, registry.name(), None);
                    }
                },
                Err(e) => warn!(registry = registry.name(), error = %e, "failed to list skills"),
            },
            _ => {
                let Some(source) = registry.as_resource_source() else {
                    continue;
                };
                let root = source.resource_root(kind);
                let files = match source.list_resource_files(kind).await {
                    Ok(files) => files,
                    Err(e) => {
                        warn!(
                            registry = registry.name(),
                            error = %e,
                            "failed to list {}",
                            kind.plural()
                        );
                        continue;
                    },
                };
                for file in &files {
                    let Some(name) = resource_name(kind, file, !root.is_empty()) else {
                        continue;
                    };
                    let inner = if root.is_empty() {
                        file.clone()
                    } else {
                        format!("{root}/{file}")
                    };
                    // Registry paths need a `<skill>/<file>` shape.
                    if !inner.contains('/') {
                        continue;
                    }
                    push_row(&mut rows, name, registry.name(), Some(inner));
                }
            },
        }
    }
    rows
}

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use {
    tempfile::NamedTempFile,
    tracing::{debug, info},
};

use {
    vibes_common::{Error, ResourceKind, Result},
    vibes_config::{
        AgentSource, InstructionRef, InstructionSource, Manifest, ManifestScope, SkillRef,
        SkillSource, split_inner_path, validate_manifest,
    },
    vibes_registry::{FetchedSkill, RegistrySet},
    vibes_skills::load_skill_dir,
    vibes_targets::{InstallOptions, Target, resolve_targets},
};

use crate::result::{ApplyResult, OpStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Overwrite existing destinations.
    pub force: bool,
    /// Symlink instead of copy where the source is persistent.
    pub link: bool,
    /// Refresh git registries before resolving anything.
    pub refresh: bool,
}

/// A resolved instruction or agent file. Registry content is spilled to a
/// temp file that lives as long as this value.
enum FileOrigin {
    Local(PathBuf),
    Spilled(NamedTempFile),
}

impl FileOrigin {
    fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Spilled(file) => file.path(),
        }
    }

    fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Spilled(_))
    }
}

/// Install everything `manifest` declares into each of its targets.
///
/// Structural manifest errors and unknown targets fail the whole run.
/// Per-resource failures never do: they are recorded as ops and the run
/// moves on. Ops are ordered skills, instructions, agents, each in manifest
/// order, crossed with targets in manifest order.
pub async fn apply(
    manifest: &Manifest,
    project_dir: &Path,
    registries: &RegistrySet,
    opts: ApplyOptions,
) -> Result<ApplyResult> {
    validate_manifest(manifest, ManifestScope::Global)?;
    let targets = resolve_targets(manifest.targets.as_slice())?;

    if opts.refresh {
        registries.refresh_all().await;
    }

    let mut run = Run {
        project_dir,
        opts,
        targets: &targets,
        result: ApplyResult::default(),
    };

    for skill in &manifest.skills {
        match resolve_skill(skill, project_dir, registries).await {
            Ok(fetched) => run.install_skill(&skill.name, &fetched),
            Err(e) => run.unresolved(ResourceKind::Skill, &skill.name, e),
        }
    }

    for instruction in &manifest.instructions {
        match resolve_instruction(instruction, project_dir, registries).await {
            Ok(source) => run.install_instruction(instruction, &source),
            Err(e) => run.unresolved(ResourceKind::Instruction, &instruction.name, e),
        }
    }

    for agent in &manifest.agents {
        let origin = match agent.source() {
            Ok(AgentSource::LocalPath(path)) => Ok(FileOrigin::Local(project_dir.join(path))),
            Ok(AgentSource::RegistryPath {
                registry,
                inner_path,
            }) => spill_registry_file(registry, inner_path, project_dir, registries).await,
            Err(e) => Err(e),
        };
        match origin {
            Ok(origin) => run.install_agent(&agent.name, &origin),
            Err(e) => run.unresolved(ResourceKind::Agent, &agent.name, e),
        }
        // Spilled files are removed here, after every target saw them.
    }

    let result = run.result;
    info!(
        installed = result.installed,
        skipped = result.skipped,
        errors = result.errors.len(),
        "apply finished"
    );
    Ok(result)
}

async fn resolve_skill(
    skill: &SkillRef,
    project_dir: &Path,
    registries: &RegistrySet,
) -> Result<FetchedSkill> {
    match skill.source() {
        SkillSource::Registry { registry, path } => {
            let registry = registries
                .get(registry)
                .ok_or_else(|| Error::not_found("registry", registry))?;
            registry.fetch(path.unwrap_or(&skill.name)).await
        },
        SkillSource::LocalPath(path) => {
            let dir = project_dir.join(path);
            let parsed = load_skill_dir(&dir)?;
            Ok(FetchedSkill::persistent(parsed, dir))
        },
        SkillSource::Search => {
            let (registry, fetched) = registries.find_skill(&skill.name).await?;
            debug!(skill = %skill.name, registry = %registry, "found skill by search");
            Ok(fetched)
        },
    }
}

/// Inline text or a file to copy.
enum InstructionBody<'a> {
    Inline(&'a str),
    File(FileOrigin),
}

async fn resolve_instruction<'a>(
    instruction: &'a InstructionRef,
    project_dir: &Path,
    registries: &RegistrySet,
) -> Result<InstructionBody<'a>> {
    Ok(match instruction.source()? {
        InstructionSource::Inline(content) => InstructionBody::Inline(content),
        InstructionSource::LocalPath(path) => {
            InstructionBody::File(FileOrigin::Local(project_dir.join(path)))
        },
        InstructionSource::RegistryPath {
            registry,
            inner_path,
        } => InstructionBody::File(
            spill_registry_file(registry, inner_path, project_dir, registries).await?,
        ),
    })
}

/// Fetch `<skill>/<rel>` from `registry` and write it to a temp file in the
/// project directory.
async fn spill_registry_file(
    registry: &str,
    inner_path: &str,
    project_dir: &Path,
    registries: &RegistrySet,
) -> Result<FileOrigin> {
    let (skill, rel) = split_inner_path(inner_path)?;
    let source = registries
        .get(registry)
        .ok_or_else(|| Error::not_found("registry", registry))?;
    let files = source.as_file_source().ok_or_else(|| {
        Error::validation(format!("registry '{registry}' cannot serve individual files"))
    })?;
    let bytes = files.fetch_file(skill, rel).await?;

    let mut spill = tempfile::Builder::new()
        .prefix(".vibes-")
        .suffix(".md")
        .tempfile_in(project_dir)
        .map_err(|e| Error::io_at(project_dir, e))?;
    spill
        .write_all(&bytes)
        .map_err(|e| Error::io_at(spill.path(), e))?;
    debug!(registry, inner_path, spill = %spill.path().display(), "spilled registry file");
    Ok(FileOrigin::Spilled(spill))
}

struct Run<'a> {
    project_dir: &'a Path,
    opts: ApplyOptions,
    targets: &'a [Box<dyn Target>],
    result: ApplyResult,
}

impl Run<'_> {
    /// Record a resource that never reached any target.
    fn unresolved(&mut self, kind: ResourceKind, name: &str, error: Error) {
        let status = if error.is_not_found() {
            OpStatus::NotFound
        } else {
            OpStatus::Error
        };
        debug!(%kind, name, error = %error, "failed to resolve resource");
        self.result
            .push(kind, name, None, status, Some(error.to_string()));
    }

    fn install_options(&self, ephemeral_source: bool) -> InstallOptions {
        InstallOptions {
            force: self.opts.force,
            link: self.opts.link && !ephemeral_source,
        }
    }

    /// Skip, install, or fail `name` on one target and record the op.
    fn install_on(
        &mut self,
        kind: ResourceKind,
        name: &str,
        target: &dyn Target,
        exists: bool,
        install: impl FnOnce() -> Result<PathBuf>,
    ) {
        let target_name = Some(target.name());
        if exists && !self.opts.force {
            self.result
                .push(kind, name, target_name, OpStatus::Skipped, None);
            return;
        }
        let (status, error) = match install() {
            Ok(_) => (OpStatus::Installed, None),
            Err(Error::Conflict { .. }) => (OpStatus::Skipped, None),
            Err(e) => (OpStatus::Error, Some(e.to_string())),
        };
        self.result.push(kind, name, target_name, status, error);
    }

    fn install_skill(&mut self, name: &str, fetched: &FetchedSkill) {
        let opts = self.install_options(fetched.is_ephemeral());
        let project_dir = self.project_dir;
        for target in self.targets {
            let target = target.as_ref();
            let exists = target.skill_exists(name, project_dir);
            self.install_on(ResourceKind::Skill, name, target, exists, || {
                target.install_skill(name, &fetched.skill, &fetched.source_dir, project_dir, opts)
            });
        }
    }

    fn install_instruction(&mut self, instruction: &InstructionRef, body: &InstructionBody<'_>) {
        let (content, file) = match body {
            InstructionBody::Inline(content) => (Some(*content), None),
            InstructionBody::File(origin) => (None, Some(origin)),
        };
        let opts = self.install_options(file.is_some_and(FileOrigin::is_ephemeral));
        let project_dir = self.project_dir;
        let name = instruction.name.as_str();

        for target in self.targets {
            let target = target.as_ref();
            if !instruction.applies_to(target.name()) {
                continue;
            }
            let exists = target.instruction_exists(name, project_dir);
            self.install_on(ResourceKind::Instruction, name, target, exists, || {
                target.install_instruction(
                    name,
                    content,
                    file.map(FileOrigin::path),
                    project_dir,
                    opts,
                )
            });
        }
    }

    fn install_agent(&mut self, name: &str, origin: &FileOrigin) {
        let opts = self.install_options(origin.is_ephemeral());
        let project_dir = self.project_dir;
        for target in self.targets {
            let target = target.as_ref();
            let exists = target.agent_exists(name, project_dir);
            self.install_on(ResourceKind::Agent, name, target, exists, || {
                target.install_agent(name, origin.path(), project_dir, opts)
            });
        }
    }
}

//! Target adapters: where each supported assistant expects skills,
//! instructions, and agents inside a project.

mod fs;

pub mod cursor;
pub mod opencode;
pub mod vscode_copilot;

use std::path::{Path, PathBuf};

use tracing::debug;

use {
    vibes_common::{Error, Result, TargetKind},
    vibes_skills::{SKILL_FILE, Skill},
};

pub use {cursor::Cursor, opencode::Opencode, vscode_copilot::VscodeCopilot};

/// How an adapter should treat existing destinations and sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Overwrite an existing destination.
    pub force: bool,
    /// Symlink sources instead of copying them, where the platform allows.
    pub link: bool,
}

/// An AI coding assistant whose project configuration we can populate.
///
/// Every assistant keeps `skills/<name>/`, `instructions/<name>.md` and
/// `agents/<name>.md` under its own project-relative root; adapters only
/// name that root. Existence checks key on the destination path.
pub trait Target: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// Project-relative root, e.g. `.opencode`.
    fn root(&self) -> &'static str;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn skill_dir(&self, name: &str, project_dir: &Path) -> PathBuf {
        project_dir.join(self.root()).join("skills").join(name)
    }

    fn instruction_path(&self, name: &str, project_dir: &Path) -> PathBuf {
        project_dir
            .join(self.root())
            .join("instructions")
            .join(format!("{name}.md"))
    }

    fn agent_path(&self, name: &str, project_dir: &Path) -> PathBuf {
        project_dir
            .join(self.root())
            .join("agents")
            .join(format!("{name}.md"))
    }

    fn skill_exists(&self, name: &str, project_dir: &Path) -> bool {
        fs::occupied(&self.skill_dir(name, project_dir))
    }

    fn instruction_exists(&self, name: &str, project_dir: &Path) -> bool {
        fs::occupied(&self.instruction_path(name, project_dir))
    }

    fn agent_exists(&self, name: &str, project_dir: &Path) -> bool {
        fs::occupied(&self.agent_path(name, project_dir))
    }

    /// Install the skill in `source_dir` under `name`. Returns the
    /// destination directory.
    fn install_skill(
        &self,
        name: &str,
        skill: &Skill,
        source_dir: &Path,
        project_dir: &Path,
        opts: InstallOptions,
    ) -> Result<PathBuf> {
        if !source_dir.join(SKILL_FILE).is_file() {
            return Err(Error::not_found(
                "skill",
                source_dir.display().to_string(),
            ));
        }
        let dest = self.skill_dir(name, project_dir);
        prepare_destination(&dest, opts)?;

        if !(opts.link && fs::symlink(source_dir, &dest)?) {
            fs::copy_dir_recursive(source_dir, &dest)?;
        }
        debug!(
            target = self.name(),
            skill = %skill.name,
            dest = %dest.display(),
            link = opts.link,
            "installed skill"
        );
        Ok(dest)
    }

    /// Install an instruction from inline `content` or from `source_path`.
    fn install_instruction(
        &self,
        name: &str,
        content: Option<&str>,
        source_path: Option<&Path>,
        project_dir: &Path,
        opts: InstallOptions,
    ) -> Result<PathBuf> {
        let dest = self.instruction_path(name, project_dir);
        match (content, source_path) {
            (Some(content), _) => {
                prepare_destination(&dest, opts)?;
                fs::write_file(&dest, content.as_bytes())?;
            },
            (None, Some(source)) => install_file(source, &dest, opts)?,
            (None, None) => {
                return Err(Error::validation(format!(
                    "instruction '{name}' has neither content nor a source file"
                )));
            },
        }
        debug!(
            target = self.name(),
            instruction = name,
            dest = %dest.display(),
            "installed instruction"
        );
        Ok(dest)
    }

    fn install_agent(
        &self,
        name: &str,
        source_path: &Path,
        project_dir: &Path,
        opts: InstallOptions,
    ) -> Result<PathBuf> {
        let dest = self.agent_path(name, project_dir);
        install_file(source_path, &dest, opts)?;
        debug!(target = self.name(), agent = name, dest = %dest.display(), "installed agent");
        Ok(dest)
    }
}

/// Clear `dest` when forcing, fail with a conflict otherwise, and create its
/// parent directory.
fn prepare_destination(dest: &Path, opts: InstallOptions) -> Result<()> {
    if fs::occupied(dest) {
        if !opts.force {
            return Err(Error::Conflict {
                path: dest.to_path_buf(),
            });
        }
        fs::remove_existing(dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::ensure_dir(parent)?;
    }
    Ok(())
}

fn install_file(source: &Path, dest: &Path, opts: InstallOptions) -> Result<()> {
    if !source.is_file() {
        return Err(Error::not_found("file", source.display().to_string()));
    }
    prepare_destination(dest, opts)?;
    if !(opts.link && fs::symlink(source, dest)?) {
        fs::copy_file(source, dest)?;
    }
    Ok(())
}

/// The adapter for `kind`.
#[must_use]
pub fn target_for(kind: TargetKind) -> Box<dyn Target> {
    match kind {
        TargetKind::VscodeCopilot => Box::new(VscodeCopilot),
        TargetKind::Opencode => Box::new(Opencode),
        TargetKind::Cursor => Box::new(Cursor),
    }
}

/// Adapters for `names`, in order. Any unknown name is a validation error.
pub fn resolve_targets<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn Target>>> {
    names
        .iter()
        .map(|name| name.as_ref().parse::<TargetKind>().map(target_for))
        .collect()
}

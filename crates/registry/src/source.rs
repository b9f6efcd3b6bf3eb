//! Registry capability traits.

use std::path::{Component, Path, PathBuf};

use {async_trait::async_trait, tempfile::TempDir};

use {
    vibes_common::{Error, ResourceKind, Result},
    vibes_skills::Skill,
};

/// A skill fetched from a registry, with the directory holding its files.
///
/// Skills materialized into a scratch directory (the embedded registry)
/// keep that directory alive until this value is dropped.
#[derive(Debug)]
pub struct FetchedSkill {
    pub skill: Skill,
    pub source_dir: PathBuf,
    scratch: Option<TempDir>,
}

impl FetchedSkill {
    /// A skill read in place from a persistent directory.
    #[must_use]
    pub fn persistent(skill: Skill, source_dir: PathBuf) -> Self {
        Self {
            skill,
            source_dir,
            scratch: None,
        }
    }

    /// A skill materialized into `scratch`, removed on drop.
    #[must_use]
    pub fn ephemeral(skill: Skill, source_dir: PathBuf, scratch: TempDir) -> Self {
        Self {
            skill,
            source_dir,
            scratch: Some(scratch),
        }
    }

    /// Whether `source_dir` disappears when this value is dropped. Targets
    /// must copy rather than link such sources.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.scratch.is_some()
    }
}

/// A source of skills.
#[async_trait]
pub trait Registry: Send + Sync {
    fn name(&self) -> &str;

    /// Sorted skill names.
    async fn list(&self) -> Result<Vec<String>>;

    /// Fetch the skill stored under `name` (a directory below the skills
    /// base). Fails with not-found when absent.
    async fn fetch(&self, name: &str) -> Result<FetchedSkill>;

    /// Bring cached data up to date. No-op by default.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn as_file_source(&self) -> Option<&dyn FileSource> {
        None
    }

    fn as_resource_source(&self) -> Option<&dyn ResourceSource> {
        None
    }
}

/// Registries that can hand out individual files (instructions, agents).
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read `<skill>/<rel_path>` from the registry.
    async fn fetch_file(&self, skill: &str, rel_path: &str) -> Result<Vec<u8>>;
}

/// Registries that can enumerate files per resource kind.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Files below the kind's base directory, relative to it, slash
    /// separated, sorted.
    async fn list_resource_files(&self, kind: ResourceKind) -> Result<Vec<String>>;

    /// The kind's base directory relative to the registry root, without
    /// surrounding slashes. Empty for the root itself.
    fn resource_root(&self, kind: ResourceKind) -> String;
}

/// Validate a registry-relative path: no absolute paths, no `..`.
pub fn sanitize_relative_path(path: &str) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::validation(format!(
                    "registry path '{path}' must stay inside the registry"
                )));
            },
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(Error::validation("registry path is empty"));
    }
    Ok(clean)
}

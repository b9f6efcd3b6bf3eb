//! Skills compiled into the binary.

use std::path::Path;

use {
    async_trait::async_trait,
    include_dir::{Dir, include_dir},
    tracing::debug,
};

use {
    vibes_common::{Error, Result},
    vibes_config::EMBEDDED_REGISTRY,
    vibes_skills::{SKILL_FILE, parse_skill},
};

use crate::source::{FetchedSkill, FileSource, Registry, sanitize_relative_path};

static BUNDLED: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/bundled");

/// Read-only registry over the bundled skills. Always present, consulted
/// before any git registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedRegistry;

impl EmbeddedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Names of bundled skills, sorted.
    #[must_use]
    pub fn skill_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUNDLED
            .dirs()
            .filter(|d| d.get_file(d.path().join(SKILL_FILE)).is_some())
            .filter_map(|d| d.path().file_name()?.to_str())
            .collect();
        names.sort_unstable();
        names
    }

    fn skill_dir(name: &str) -> Option<&'static Dir<'static>> {
        BUNDLED
            .get_dir(name)
            .filter(|d| d.get_file(d.path().join(SKILL_FILE)).is_some())
    }
}

/// Write every file below `dir` into `dest`, keeping paths relative to the
/// bundle root.
fn materialize(dir: &Dir<'_>, dest: &Path) -> Result<()> {
    let mut stack = vec![dir];
    while let Some(dir) = stack.pop() {
        let target = dest.join(dir.path());
        std::fs::create_dir_all(&target).map_err(|e| Error::io_at(&target, e))?;
        for file in dir.files() {
            let path = dest.join(file.path());
            std::fs::write(&path, file.contents()).map_err(|e| Error::io_at(&path, e))?;
        }
        stack.extend(dir.dirs());
    }
    Ok(())
}

#[async_trait]
impl Registry for EmbeddedRegistry {
    fn name(&self) -> &str {
        EMBEDDED_REGISTRY
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(Self::skill_names().into_iter().map(String::from).collect())
    }

    async fn fetch(&self, name: &str) -> Result<FetchedSkill> {
        let dir = Self::skill_dir(name).ok_or_else(|| Error::not_found("skill", name))?;
        let skill_md = dir
            .get_file(dir.path().join(SKILL_FILE))
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| Error::not_found("skill", name))?;
        let skill = parse_skill(skill_md)?;

        let scratch = tempfile::Builder::new()
            .prefix("vibes-embedded-")
            .tempdir()?;
        materialize(dir, scratch.path())?;
        let source_dir = scratch.path().join(dir.path());
        debug!(skill = name, dir = %source_dir.display(), "materialized embedded skill");
        Ok(FetchedSkill::ephemeral(skill, source_dir, scratch))
    }

    fn as_file_source(&self) -> Option<&dyn FileSource> {
        Some(self)
    }
}

#[async_trait]
impl FileSource for EmbeddedRegistry {
    async fn fetch_file(&self, skill: &str, rel_path: &str) -> Result<Vec<u8>> {
        let path = Path::new(skill).join(sanitize_relative_path(rel_path)?);
        BUNDLED
            .get_file(&path)
            .map(|f| f.contents().to_vec())
            .ok_or_else(|| Error::not_found("file", path.display().to_string()))
    }
}

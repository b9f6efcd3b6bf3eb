use std::path::{Component, Path, PathBuf};

use {
    tracing::debug,
    vibes_common::{Error, Result},
};

use crate::{
    merge::merge_manifests,
    schema::{Manifest, SkillSource},
};

/// Project manifest file names, in priority order. `vibes.yml` is the legacy
/// spelling and is only used when `vibes.yaml` is absent.
pub const MANIFEST_FILENAMES: &[&str] = &["vibes.yaml", "vibes.yml"];

/// Load a manifest from the given path. An empty file is an empty manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
    if raw.trim().is_empty() {
        return Ok(Manifest::default());
    }
    serde_yaml::from_str(&raw).map_err(|e| Error::parse(path.display().to_string(), e))
}

/// Find the manifest file in `dir`, if any.
#[must_use]
pub fn find_project_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Returns the path of an existing project manifest, or the preferred
/// `vibes.yaml` path.
#[must_use]
pub fn project_manifest_path(dir: &Path) -> PathBuf {
    find_project_manifest(dir).unwrap_or_else(|| dir.join(MANIFEST_FILENAMES[0]))
}

/// Load the project manifest, returning it with the path it was read from.
pub fn load_from_project(dir: &Path) -> Result<(Manifest, PathBuf)> {
    let path = find_project_manifest(dir).ok_or_else(|| {
        Error::not_found(
            "manifest",
            dir.join(MANIFEST_FILENAMES[0]).display().to_string(),
        )
    })?;
    debug!(path = %path.display(), "loading project manifest");
    let manifest = load_manifest(&path)?;
    Ok((manifest, path))
}

/// Leading comment block of an existing manifest, so rewrites keep it.
#[must_use]
pub fn read_header(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let mut header = String::new();
    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.is_empty() {
            header.push_str(line);
        } else {
            break;
        }
    }
    header.contains('#').then_some(header)
}

/// Serialize `manifest` to YAML and write it to `path`, optionally preceded by
/// `header` verbatim.
///
/// Creates parent directories if needed and writes atomically via a temp
/// file + rename.
pub fn save_manifest(manifest: &Manifest, path: &Path, header: Option<&str>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
    }

    let mut data = String::new();
    if let Some(header) = header.filter(|h| !h.is_empty()) {
        data.push_str(header);
        if !header.ends_with('\n') {
            data.push('\n');
        }
    }
    data.push_str(&serde_yaml::to_string(manifest)?);

    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, data).map_err(|e| Error::io_at(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::io_at(path, e))?;
    debug!(path = %path.display(), "saved manifest");
    Ok(())
}

// ── Layering ────────────────────────────────────────────────────────────────

/// Both manifest layers plus their merge. Layers hold paths already resolved
/// against the directory of the file that declared them.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    pub global: Option<Manifest>,
    pub global_path: Option<PathBuf>,
    pub local: Option<Manifest>,
    pub local_path: Option<PathBuf>,
    pub merged: Manifest,
}

impl Layers {
    /// The global layer, or an empty manifest.
    #[must_use]
    pub fn global_or_default(&self) -> Manifest {
        self.global.clone().unwrap_or_default()
    }

    /// The local layer, or an empty manifest.
    #[must_use]
    pub fn local_or_default(&self) -> Manifest {
        self.local.clone().unwrap_or_default()
    }
}

/// Load the project and global manifests (either may be absent), resolve
/// relative local paths against each file's directory, and merge them.
///
/// Fails with not-found only if both are absent.
pub fn load_merged(project_dir: &Path, global_path: Option<&Path>) -> Result<Layers> {
    let mut layers = Layers::default();

    if let Some(path) = find_project_manifest(project_dir) {
        let mut local = load_manifest(&path)?;
        resolve_relative_paths(&mut local, path.parent().unwrap_or(project_dir));
        layers.local = Some(local);
        layers.local_path = Some(path);
    }

    if let Some(path) = global_path.filter(|p| p.is_file()) {
        debug!(path = %path.display(), "loading global manifest");
        let mut global = load_manifest(path)?;
        if let Some(dir) = path.parent() {
            resolve_relative_paths(&mut global, dir);
        }
        layers.global = Some(global);
        layers.global_path = Some(path.to_path_buf());
    }

    if layers.local.is_none() && layers.global.is_none() {
        return Err(Error::not_found(
            "manifest",
            project_dir.join(MANIFEST_FILENAMES[0]).display().to_string(),
        ));
    }

    layers.merged = merge_manifests(layers.global.as_ref(), layers.local.as_ref());
    Ok(layers)
}

/// Rewrite every local (non-registry) `path` in `manifest` to an absolute
/// path rooted at `base_dir`. Registry-relative paths are left alone.
pub fn resolve_relative_paths(manifest: &mut Manifest, base_dir: &Path) {
    for skill in &mut manifest.skills {
        if let SkillSource::LocalPath(_) = skill.source()
            && let Some(path) = skill.path.as_mut()
        {
            *path = resolve_path(base_dir, path);
        }
    }
    for instruction in &mut manifest.instructions {
        if instruction.registry.is_none()
            && let Some(path) = instruction.path.as_mut()
        {
            *path = resolve_path(base_dir, path);
        }
    }
    for agent in &mut manifest.agents {
        if agent.registry.is_none()
            && let Some(path) = agent.path.as_mut()
        {
            *path = resolve_path(base_dir, path);
        }
    }
}

/// Resolve `path` against `base_dir` (expanding a leading `~/`) and clean
/// `.`/`..` components lexically. A relative `base_dir` is taken from the
/// current directory, so the result is always absolute.
#[must_use]
pub fn resolve_path(base_dir: &Path, path: &str) -> String {
    let expanded = match path.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    };
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        std::path::absolute(base_dir)
            .unwrap_or_else(|_| base_dir.to_path_buf())
            .join(expanded)
    };
    normalize(&joined).to_string_lossy().into_owned()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            },
            other => out.push(other),
        }
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{AgentRef, InstructionRef, RegistryRef, SkillRef},
        vibes_common::ErrorKind,
    };

    fn sample() -> Manifest {
        Manifest {
            registries: vec![RegistryRef {
                name: "r1".into(),
                url: "https://example.com/r1.git".into(),
                reference: "latest".into(),
                paths: Default::default(),
            }],
            skills: vec![SkillRef::named("code-review")],
            instructions: vec![InstructionRef {
                name: "style".into(),
                content: Some("Be terse.".into()),
                ..Default::default()
            }],
            agents: vec![AgentRef {
                name: "reviewer".into(),
                path: Some("./agents/reviewer.md".into()),
                registry: None,
            }],
            targets: vec!["opencode".into()],
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibes.yaml");
        let manifest = sample();
        save_manifest(&manifest, &path, None).unwrap();
        assert_eq!(load_manifest(&path).unwrap(), manifest);
    }

    #[test]
    fn save_with_header_preserves_header_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibes.yaml");
        let header = "# managed by positive-vibes\n# edit freely\n";
        let manifest = sample();
        save_manifest(&manifest, &path, Some(header)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(header));
        assert_eq!(load_manifest(&path).unwrap(), manifest);
        assert_eq!(read_header(&path).as_deref(), Some(header));
    }

    #[test]
    fn read_header_none_without_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibes.yaml");
        std::fs::write(&path, "targets: [opencode]\n").unwrap();
        assert!(read_header(&path).is_none());
    }

    #[test]
    fn empty_file_is_empty_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibes.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_manifest(&path).unwrap(), Manifest::default());
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibes.yaml");
        std::fs::write(&path, "skills: [\n").unwrap();
        assert_eq!(load_manifest(&path).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn yaml_preferred_over_legacy_yml() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("vibes.yml"), "targets: [cursor]\n").unwrap();
        let (m, path) = load_from_project(tmp.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "vibes.yml");
        assert_eq!(m.targets, vec!["cursor"]);

        std::fs::write(tmp.path().join("vibes.yaml"), "targets: [opencode]\n").unwrap();
        let (m, path) = load_from_project(tmp.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "vibes.yaml");
        assert_eq!(m.targets, vec!["opencode"]);
    }

    #[test]
    fn load_from_project_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_from_project(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn load_merged_resolves_paths_against_declaring_file() {
        let project = tempfile::tempdir().unwrap();
        let global_dir = tempfile::tempdir().unwrap();
        let global_path = global_dir.path().join("vibes.yaml");

        std::fs::write(
            project.path().join("vibes.yaml"),
            "skills:\n  - name: mine\n    path: ./skills/mine\ntargets: [opencode]\n",
        )
        .unwrap();
        std::fs::write(
            &global_path,
            "agents:\n  - name: helper\n    path: agents/helper.md\ninstructions:\n  - name: remote\n    registry: r1\n    path: skill/rules.md\n",
        )
        .unwrap();

        let layers = load_merged(project.path(), Some(&global_path)).unwrap();
        let merged = &layers.merged;

        let skill_path = PathBuf::from(merged.skills[0].path.as_deref().unwrap());
        assert_eq!(skill_path, project.path().join("skills/mine"));

        let agent_path = PathBuf::from(merged.agents[0].path.as_deref().unwrap());
        assert_eq!(agent_path, global_dir.path().join("agents/helper.md"));

        // Registry-relative paths are not touched.
        assert_eq!(merged.instructions[0].path.as_deref(), Some("skill/rules.md"));
    }

    #[test]
    fn load_merged_with_only_global() {
        let project = tempfile::tempdir().unwrap();
        let global_dir = tempfile::tempdir().unwrap();
        let global_path = global_dir.path().join("vibes.yaml");
        std::fs::write(&global_path, "targets: [cursor]\n").unwrap();

        let layers = load_merged(project.path(), Some(&global_path)).unwrap();
        assert!(layers.local.is_none());
        assert_eq!(layers.merged.targets, vec!["cursor"]);
    }

    #[test]
    fn load_merged_both_absent_is_not_found() {
        let project = tempfile::tempdir().unwrap();
        let err = load_merged(project.path(), Some(&project.path().join("nope.yaml"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn resolve_path_cleans_components() {
        let base = Path::new("/work/project");
        assert_eq!(resolve_path(base, "./skills/x"), "/work/project/skills/x");
        assert_eq!(resolve_path(base, "../shared/x"), "/work/shared/x");
        assert_eq!(resolve_path(base, "/abs/x"), "/abs/x");
    }

    #[test]
    fn resolve_path_absolutizes_relative_base() {
        let resolved = PathBuf::from(resolve_path(Path::new("proj"), "./skills/mine"));
        assert!(resolved.is_absolute());
        assert_eq!(
            resolved,
            std::env::current_dir().unwrap().join("proj/skills/mine")
        );
    }
}

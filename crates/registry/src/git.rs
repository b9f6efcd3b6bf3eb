//! Git-backed registries cached under the user cache directory.
//!
//! Each registry is cloned once into `<cache_root>/<name>` and reused. The
//! configured `ref` decides how the clone is made: `latest` tracks the
//! default branch, a 7-40 character lowercase hex string is a commit, and
//! anything else is a branch or tag. Concurrent invocations serialize on
//! `<cache_root>/<name>.lock`.

use std::{
    fs::OpenOptions,
    path::{Component, Path, PathBuf},
};

use {
    async_trait::async_trait,
    fd_lock::RwLock,
    tokio::process::Command,
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use {
    vibes_common::{Error, ResourceKind, Result},
    vibes_config::{LATEST_REF, RegistryPaths, RegistryRef},
    vibes_skills::{SKILL_FILE, load_skill_dir},
};

use crate::source::{
    FetchedSkill, FileSource, Registry, ResourceSource, sanitize_relative_path,
};

/// How a configured `ref` is checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Track the default branch.
    Latest,
    /// A commit hash.
    Sha,
    /// A branch, falling back to a tag.
    Named,
}

fn is_commit_sha(reference: &str) -> bool {
    (7..=40).contains(&reference.len())
        && reference
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[must_use]
pub fn classify_ref(reference: &str) -> RefKind {
    if reference == LATEST_REF {
        RefKind::Latest
    } else if is_commit_sha(reference) {
        RefKind::Sha
    } else {
        RefKind::Named
    }
}

fn is_ssh_url(url: &str) -> bool {
    url.starts_with("git@") || url.starts_with("ssh://")
}

/// A registry backed by a cached clone of a git repository.
#[derive(Debug, Clone)]
pub struct GitRegistry {
    name: String,
    url: String,
    reference: String,
    paths: RegistryPaths,
    cache_root: PathBuf,
}

impl GitRegistry {
    /// Build a registry for `config`, caching under `cache_root`. The
    /// registry name becomes a directory name and must be a single path
    /// component.
    pub fn new(config: &RegistryRef, cache_root: &Path) -> Result<Self> {
        let mut components = Path::new(&config.name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(Error::validation(format!(
                "registry name '{}' must be a plain directory name",
                config.name
            )));
        }
        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            reference: config.reference.clone(),
            paths: config.paths.clone(),
            cache_root: cache_root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.name)
    }

    fn lock_path(&self) -> PathBuf {
        self.cache_root.join(format!("{}.lock", self.name))
    }

    #[must_use]
    pub fn ref_kind(&self) -> RefKind {
        classify_ref(&self.reference)
    }

    fn kind_base(&self, kind: ResourceKind) -> PathBuf {
        let root = self.resource_root(kind);
        if root.is_empty() {
            self.cache_dir()
        } else {
            self.cache_dir().join(root)
        }
    }

    fn open_lock(&self) -> Result<RwLock<std::fs::File>> {
        std::fs::create_dir_all(&self.cache_root).map_err(|e| Error::io_at(&self.cache_root, e))?;
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::io_at(&path, e))?;
        Ok(RwLock::new(file))
    }

    /// Make sure a checkout exists in the cache.
    ///
    /// An existing cache directory is used as-is, even if a previous clone
    /// was interrupted, so cached registries keep working offline.
    pub async fn ensure_cache(&self) -> Result<()> {
        let mut lock = self.open_lock()?;
        let _guard = lock.write().map_err(|e| Error::io_at(self.lock_path(), e))?;
        self.ensure_cache_locked().await
    }

    async fn ensure_cache_locked(&self) -> Result<()> {
        let dir = self.cache_dir();
        if dir.exists() {
            debug!(registry = %self.name, dir = %dir.display(), "using cached checkout");
            return Ok(());
        }

        info!(
            registry = %self.name,
            url = %self.url,
            reference = %self.reference,
            "cloning registry"
        );
        match self.ref_kind() {
            RefKind::Latest => self.clone_repo(&[]).await,
            RefKind::Sha => {
                self.clone_repo(&[]).await?;
                self.checkout_or_discard(&self.reference).await
            },
            RefKind::Named => {
                let branch_clone = self
                    .clone_repo(&["--single-branch", "--branch", self.reference.as_str()])
                    .await;
                if let Err(e) = branch_clone {
                    debug!(registry = %self.name, error = %e, "branch clone failed, trying tag");
                    self.clone_repo(&[]).await?;
                    self.checkout_or_discard(&format!("tags/{}", self.reference))
                        .await?;
                }
                Ok(())
            },
        }
    }

    async fn clone_repo(&self, extra: &[&str]) -> Result<()> {
        let dir = self.cache_dir();
        let mut args = vec!["clone", "--quiet"];
        args.extend_from_slice(extra);
        args.push(&self.url);
        let dir_arg = dir.to_string_lossy();
        args.push(&dir_arg);

        let result = self.git("git clone", &args, None).await;
        if result.is_err() {
            discard(&dir);
        }
        result.map(drop)
    }

    async fn checkout_or_discard(&self, revision: &str) -> Result<()> {
        let dir = self.cache_dir();
        match self
            .git("git checkout", &["checkout", "--quiet", revision], Some(&dir))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(registry = %self.name, revision, error = %e, "checkout failed");
                discard(&dir);
                Err(Error::RefNotFound {
                    reference: self.reference.clone(),
                    url: self.url.clone(),
                })
            },
        }
    }

    async fn git(
        &self,
        operation: &'static str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if is_ssh_url(&self.url) {
            cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| Error::command_execution(operation, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::command_failed(operation, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn discard(dir: &Path) {
    if dir.exists()
        && let Err(e) = std::fs::remove_dir_all(dir)
    {
        warn!(dir = %dir.display(), error = %e, "failed to remove partial clone");
    }
}

#[async_trait]
impl Registry for GitRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.ensure_cache().await?;
        let base = self.kind_base(ResourceKind::Skill);
        let Ok(entries) = std::fs::read_dir(&base) else {
            return Ok(Vec::new());
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().join(SKILL_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<FetchedSkill> {
        self.ensure_cache().await?;
        let dir = self.kind_base(ResourceKind::Skill).join(sanitize_relative_path(name)?);
        let skill = load_skill_dir(&dir)?;
        debug!(registry = %self.name, skill = name, dir = %dir.display(), "fetched skill");
        Ok(FetchedSkill::persistent(skill, dir))
    }

    /// Pull the default branch for `latest`; pinned refs are left alone.
    /// Pull failures with a usable cache are logged and ignored.
    async fn refresh(&self) -> Result<()> {
        let mut lock = self.open_lock()?;
        let _guard = lock.write().map_err(|e| Error::io_at(self.lock_path(), e))?;

        let dir = self.cache_dir();
        if !dir.exists() {
            return self.ensure_cache_locked().await;
        }
        if self.ref_kind() != RefKind::Latest {
            debug!(
                registry = %self.name,
                reference = %self.reference,
                "pinned ref, skipping refresh"
            );
            return Ok(());
        }

        match self
            .git("git pull", &["pull", "--ff-only", "--quiet"], Some(&dir))
            .await
        {
            Ok(_) => info!(registry = %self.name, "refreshed registry"),
            Err(e) => {
                warn!(registry = %self.name, error = %e, "refresh failed, using cached checkout");
            },
        }
        Ok(())
    }

    fn as_file_source(&self) -> Option<&dyn FileSource> {
        Some(self)
    }

    fn as_resource_source(&self) -> Option<&dyn ResourceSource> {
        Some(self)
    }
}

#[async_trait]
impl FileSource for GitRegistry {
    /// Reads `<skills base>/<skill>/<rel_path>`, falling back to
    /// `<repo root>/<skill>/<rel_path>`.
    async fn fetch_file(&self, skill: &str, rel_path: &str) -> Result<Vec<u8>> {
        self.ensure_cache().await?;
        let inner = sanitize_relative_path(skill)?.join(sanitize_relative_path(rel_path)?);
        let candidates = [
            self.kind_base(ResourceKind::Skill).join(&inner),
            self.cache_dir().join(&inner),
        ];
        for path in &candidates {
            if path.is_file() {
                debug!(registry = %self.name, path = %path.display(), "reading registry file");
                return std::fs::read(path).map_err(|e| Error::io_at(path, e));
            }
        }
        Err(Error::not_found(
            "file",
            format!("{}:{}", self.name, inner.display()),
        ))
    }
}

#[async_trait]
impl ResourceSource for GitRegistry {
    async fn list_resource_files(&self, kind: ResourceKind) -> Result<Vec<String>> {
        self.ensure_cache().await?;
        let base = self.kind_base(kind);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<String> = WalkDir::new(&base)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .flatten()
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&base).ok()?;
                let parts: Vec<&str> = rel.iter().filter_map(|p| p.to_str()).collect();
                Some(parts.join("/"))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn resource_root(&self, kind: ResourceKind) -> String {
        self.paths
            .for_kind(kind)
            .map(|p| p.trim_start_matches("./").trim_matches('/').to_string())
            .unwrap_or_default()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::process::Command as StdCommand, vibes_common::ErrorKind};

    fn run_git(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn write_skill(repo: &Path, base: &str, name: &str, body: &str) {
        let dir = repo.join(base).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: test skill\n---\n{body}"),
        )
        .unwrap();
    }

    fn commit_all(repo: &Path, message: &str) -> String {
        run_git(repo, &["add", "-A"]);
        run_git(repo, &["commit", "--quiet", "-m", message]);
        run_git(repo, &["rev-parse", "HEAD"])
    }

    /// A repo with `alpha` at v1 (tagged `v1.0.0`) and then v2 on `main`.
    fn fixture_repo() -> (tempfile::TempDir, String) {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path();
        run_git(repo, &["init", "--quiet", "-b", "main"]);
        write_skill(repo, "", "alpha", "v1 body\n");
        let first = commit_all(repo, "v1");
        run_git(repo, &["tag", "v1.0.0"]);
        write_skill(repo, "", "alpha", "v2 body\n");
        write_skill(repo, "", "beta", "beta body\n");
        commit_all(repo, "v2");
        (tmp, first)
    }

    fn registry(url: &Path, reference: &str, cache: &Path) -> GitRegistry {
        GitRegistry::new(
            &RegistryRef {
                name: "fixture".into(),
                url: url.display().to_string(),
                reference: reference.into(),
                paths: RegistryPaths::default(),
            },
            cache,
        )
        .unwrap()
    }

    #[rstest]
    #[case("latest", RefKind::Latest)]
    #[case("abc1234", RefKind::Sha)]
    #[case("0123456789abcdef0123456789abcdef01234567", RefKind::Sha)]
    #[case("abc123", RefKind::Named)]
    #[case("ABC1234", RefKind::Named)]
    #[case("v1.0.0", RefKind::Named)]
    #[case("main", RefKind::Named)]
    fn ref_classification(#[case] reference: &str, #[case] expected: RefKind) {
        assert_eq!(classify_ref(reference), expected);
    }

    #[test]
    fn name_must_be_single_component() {
        let cache = tempfile::tempdir().unwrap();
        let config = RegistryRef {
            name: "../escape".into(),
            url: "https://example.com/x.git".into(),
            reference: "latest".into(),
            paths: RegistryPaths::default(),
        };
        assert!(GitRegistry::new(&config, cache.path()).is_err());
    }

    #[tokio::test]
    async fn latest_clones_default_branch() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "latest", cache.path());

        assert_eq!(reg.list().await.unwrap(), vec!["alpha", "beta"]);
        let fetched = reg.fetch("alpha").await.unwrap();
        assert_eq!(fetched.skill.instructions, "v2 body\n");
        assert!(!fetched.is_ephemeral());
        assert!(cache.path().join("fixture.lock").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_ensure_cache_share_one_clone() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let first = registry(repo.path(), "latest", cache.path());
        let second = first.clone();

        let a = tokio::spawn(async move { first.ensure_cache().await });
        let b = tokio::spawn(async move { second.ensure_cache().await });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let reg = registry(repo.path(), "latest", cache.path());
        assert_eq!(reg.list().await.unwrap(), vec!["alpha", "beta"]);
        run_git(&reg.cache_dir(), &["status", "--short"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ensure_cache_waits_for_the_lock() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "latest", cache.path());
        let cache_dir = reg.cache_dir();

        let mut held = reg.open_lock().unwrap();
        let guard = held.write().unwrap();

        let waiting = tokio::spawn(async move { reg.ensure_cache().await });
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(!waiting.is_finished());
        assert!(!cache_dir.exists());

        drop(guard);
        waiting.await.unwrap().unwrap();
        assert!(cache_dir.join("alpha").join(SKILL_FILE).is_file());
    }

    #[tokio::test]
    async fn tag_ref_checks_out_tag() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "v1.0.0", cache.path());

        let fetched = reg.fetch("alpha").await.unwrap();
        assert_eq!(fetched.skill.instructions, "v1 body\n");
        assert_eq!(reg.fetch("beta").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn sha_ref_checks_out_commit() {
        let (repo, first) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), &first[..12], cache.path());

        let fetched = reg.fetch("alpha").await.unwrap();
        assert_eq!(fetched.skill.instructions, "v1 body\n");
    }

    #[tokio::test]
    async fn missing_ref_fails_and_leaves_no_cache() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();

        let reg = registry(repo.path(), "no-such-branch", cache.path());
        let err = reg.ensure_cache().await.unwrap_err();
        assert!(matches!(err, Error::RefNotFound { .. }), "{err}");
        assert!(!reg.cache_dir().exists());

        let reg = registry(repo.path(), "deadbeef", cache.path());
        let err = reg.ensure_cache().await.unwrap_err();
        assert!(matches!(err, Error::RefNotFound { .. }), "{err}");
        assert!(!reg.cache_dir().exists());
    }

    #[tokio::test]
    async fn unreachable_url_is_git_error() {
        let cache = tempfile::tempdir().unwrap();
        let missing = cache.path().join("does-not-exist");
        let reg = registry(&missing, "latest", cache.path());
        let err = reg.ensure_cache().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Git);
        assert!(!reg.cache_dir().exists());
    }

    #[tokio::test]
    async fn existing_cache_is_reused_without_git() {
        let cache = tempfile::tempdir().unwrap();
        let missing = cache.path().join("does-not-exist");
        let reg = registry(&missing, "latest", cache.path());

        // A present (even partial) cache counts as valid.
        std::fs::create_dir_all(reg.cache_dir()).unwrap();
        reg.ensure_cache().await.unwrap();
        assert!(reg.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_latest_pulls_new_commits() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "latest", cache.path());
        reg.ensure_cache().await.unwrap();

        write_skill(repo.path(), "", "gamma", "new\n");
        commit_all(repo.path(), "add gamma");

        assert!(!reg.list().await.unwrap().contains(&"gamma".to_string()));
        reg.refresh().await.unwrap();
        assert!(reg.list().await.unwrap().contains(&"gamma".to_string()));
    }

    #[tokio::test]
    async fn refresh_pinned_is_noop() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "v1.0.0", cache.path());
        reg.ensure_cache().await.unwrap();
        reg.refresh().await.unwrap();
        assert_eq!(
            reg.fetch("alpha").await.unwrap().skill.instructions,
            "v1 body\n"
        );
    }

    #[tokio::test]
    async fn refresh_failure_with_cache_is_not_fatal() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "latest", cache.path());
        reg.ensure_cache().await.unwrap();

        drop(repo);
        reg.refresh().await.unwrap();
        assert_eq!(reg.list().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn refresh_without_cache_clones() {
        let (repo, _) = fixture_repo();
        let cache = tempfile::tempdir().unwrap();
        let reg = registry(repo.path(), "latest", cache.path());
        reg.refresh().await.unwrap();
        assert!(reg.cache_dir().join("alpha/SKILL.md").is_file());
    }

    #[tokio::test]
    async fn kind_paths_and_file_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path();
        run_git(repo, &["init", "--quiet", "-b", "main"]);
        write_skill(repo, "skills", "lint", "lint body\n");
        std::fs::create_dir_all(repo.join("skills/lint/agents")).unwrap();
        std::fs::write(repo.join("skills/lint/agents/linter.agent.md"), "agent").unwrap();
        std::fs::create_dir_all(repo.join("instructions/lang")).unwrap();
        std::fs::write(repo.join("instructions/style.instructions.md"), "style").unwrap();
        std::fs::write(repo.join("instructions/lang/rust.md"), "rust").unwrap();
        commit_all(repo, "init");

        let cache = tempfile::tempdir().unwrap();
        let reg = GitRegistry::new(
            &RegistryRef {
                name: "kinds".into(),
                url: repo.display().to_string(),
                reference: "main".into(),
                paths: RegistryPaths {
                    skills: Some("skills/".into()),
                    instructions: Some("./instructions".into()),
                    agents: None,
                },
            },
            cache.path(),
        )
        .unwrap();

        assert_eq!(reg.list().await.unwrap(), vec!["lint"]);
        assert_eq!(reg.resource_root(ResourceKind::Instruction), "instructions");
        assert_eq!(reg.resource_root(ResourceKind::Agent), "");
        assert_eq!(
            reg.list_resource_files(ResourceKind::Instruction).await.unwrap(),
            vec!["lang/rust.md", "style.instructions.md"]
        );

        // Skills base first.
        let agent = reg.fetch_file("lint", "agents/linter.agent.md").await.unwrap();
        assert_eq!(agent, b"agent");
        // Repo root fallback.
        let style = reg
            .fetch_file("instructions", "style.instructions.md")
            .await
            .unwrap();
        assert_eq!(style, b"style");

        let err = reg.fetch_file("lint", "missing.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

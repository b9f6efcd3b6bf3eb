use std::path::Path;

use tracing::{debug, warn};

use {
    vibes_common::{Error, Result},
    vibes_config::{EMBEDDED_REGISTRY, Manifest},
};

use crate::{
    embedded::EmbeddedRegistry,
    git::GitRegistry,
    source::{FetchedSkill, Registry},
};

/// Ordered collection of registries. Searches consult them in order, with
/// the embedded registry first.
pub struct RegistrySet {
    registries: Vec<Box<dyn Registry>>,
}

impl std::fmt::Debug for RegistrySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.registries.iter().map(|r| r.name()))
            .finish()
    }
}

impl RegistrySet {
    #[must_use]
    pub fn new(registries: Vec<Box<dyn Registry>>) -> Self {
        Self { registries }
    }

    /// Only the bundled skills.
    #[must_use]
    pub fn embedded_only() -> Self {
        Self::new(vec![Box::new(EmbeddedRegistry::new())])
    }

    /// The embedded registry followed by every git registry declared in
    /// `manifest`, in declaration order. Nothing is cloned until used.
    pub fn from_manifest(manifest: &Manifest, cache_root: &Path) -> Result<Self> {
        let mut registries: Vec<Box<dyn Registry>> = vec![Box::new(EmbeddedRegistry::new())];
        for config in &manifest.registries {
            if config.name == EMBEDDED_REGISTRY {
                warn!(url = %config.url, "registry name 'embedded' is reserved, ignoring entry");
                continue;
            }
            registries.push(Box::new(GitRegistry::new(config, cache_root)?));
        }
        Ok(Self::new(registries))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Registry> {
        self.registries
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Registry> {
        self.registries.iter().map(|r| r.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Fetch `name` from the first registry that has it, returning that
    /// registry's name alongside the skill.
    ///
    /// Registries that fail for reasons other than not-found are logged and
    /// skipped, so one unreachable registry does not hide the others.
    pub async fn find_skill(&self, name: &str) -> Result<(String, FetchedSkill)> {
        for registry in &self.registries {
            match registry.fetch(name).await {
                Ok(fetched) => {
                    debug!(skill = name, registry = registry.name(), "resolved skill");
                    return Ok((registry.name().to_string(), fetched));
                },
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(
                        skill = name,
                        registry = registry.name(),
                        error = %e,
                        "registry lookup failed"
                    );
                },
            }
        }
        Err(Error::not_found("skill", name))
    }

    /// Refresh every registry in order. Failures are logged, not returned.
    pub async fn refresh_all(&self) {
        for registry in &self.registries {
            if let Err(e) = registry.refresh().await {
                warn!(registry = registry.name(), error = %e, "failed to refresh registry");
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        vibes_common::ErrorKind,
        vibes_config::{RegistryPaths, RegistryRef},
        vibes_skills::Skill,
    };

    /// Registry that always fails with a git error.
    struct Broken;

    #[async_trait]
    impl Registry for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn list(&self) -> Result<Vec<String>> {
            Err(Error::command_failed("git clone", "unreachable"))
        }

        async fn fetch(&self, _name: &str) -> Result<FetchedSkill> {
            Err(Error::command_failed("git clone", "unreachable"))
        }

        async fn refresh(&self) -> Result<()> {
            Err(Error::command_failed("git pull", "unreachable"))
        }
    }

    /// Registry holding a single skill on disk.
    struct Single {
        dir: tempfile::TempDir,
    }

    #[async_trait]
    impl Registry for Single {
        fn name(&self) -> &str {
            "single"
        }

        async fn list(&self) -> Result<Vec<String>> {
            Ok(vec!["only".into()])
        }

        async fn fetch(&self, name: &str) -> Result<FetchedSkill> {
            if name != "only" {
                return Err(Error::not_found("skill", name));
            }
            let skill = Skill {
                name: "only".into(),
                ..Default::default()
            };
            Ok(FetchedSkill::persistent(skill, self.dir.path().to_path_buf()))
        }
    }

    #[test]
    fn from_manifest_orders_embedded_first_and_skips_reserved_name() {
        let cache = tempfile::tempdir().unwrap();
        let reg = |name: &str| RegistryRef {
            name: name.into(),
            url: format!("https://example.com/{name}.git"),
            reference: "latest".into(),
            paths: RegistryPaths::default(),
        };
        let manifest = Manifest {
            registries: vec![reg("b"), reg("embedded"), reg("a")],
            ..Default::default()
        };
        let set = RegistrySet::from_manifest(&manifest, cache.path()).unwrap();
        let names: Vec<&str> = set.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["embedded", "b", "a"]);
        assert!(set.get("a").is_some());
        assert!(set.get("c").is_none());
    }

    #[tokio::test]
    async fn find_skill_skips_broken_registries() {
        let set = RegistrySet::new(vec![
            Box::new(EmbeddedRegistry::new()),
            Box::new(Broken),
            Box::new(Single {
                dir: tempfile::tempdir().unwrap(),
            }),
        ]);

        let (registry, fetched) = set.find_skill("only").await.unwrap();
        assert_eq!(registry, "single");
        assert_eq!(fetched.skill.name, "only");

        let (registry, _) = set.find_skill("code-review").await.unwrap();
        assert_eq!(registry, "embedded");

        let err = set.find_skill("nowhere").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn refresh_all_tolerates_failures() {
        let set = RegistrySet::new(vec![Box::new(Broken), Box::new(EmbeddedRegistry::new())]);
        set.refresh_all().await;
    }
}

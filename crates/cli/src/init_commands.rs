use {anyhow::Result, std::fmt::Write as _};

use {
    vibes_common::TargetKind,
    vibes_config::{Manifest, find_project_manifest, project_manifest_path, save_manifest},
    vibes_registry::EmbeddedRegistry,
};

use crate::{Context, style::palette};

/// Comment block written above a fresh manifest.
fn starter_header(bundled: &[&str]) -> String {
    let mut header = String::from(
        "# positive-vibes manifest\n\
         # Declare skills, instructions, and agents, then run `vibes apply`.\n\
         #\n\
         # Bundled skills you can add:\n\
         # skills:\n",
    );
    for name in bundled {
        let _ = writeln!(header, "#   - name: {name}");
    }
    header.push_str("#\n# Targets: ");
    header.push_str(&TargetKind::names().join(", "));
    header.push('\n');
    header
}

fn starter_manifest() -> Manifest {
    Manifest {
        targets: vec![TargetKind::VscodeCopilot.as_str().to_string()],
        ..Manifest::default()
    }
}

pub fn handle_init(ctx: &Context, force: bool) -> Result<()> {
    if let Some(existing) = find_project_manifest(&ctx.project_dir)
        && !force
    {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            existing.display()
        );
    }

    let path = project_manifest_path(&ctx.project_dir);
    let header = starter_header(&EmbeddedRegistry::skill_names());
    save_manifest(&starter_manifest(), &path, Some(&header))?;

    let p = palette();
    println!("{}created{} {}", p.green, p.reset, path.display());
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, vibes_config::load_manifest};

    fn ctx(dir: &std::path::Path) -> Context {
        Context {
            project_dir: dir.to_path_buf(),
            global_path: dir.join("global").join("vibes.yaml"),
            cache_root: dir.join("cache"),
        }
    }

    #[test]
    fn writes_loadable_starter() {
        let tmp = tempfile::tempdir().unwrap();
        handle_init(&ctx(tmp.path()), false).unwrap();

        let path = tmp.path().join("vibes.yaml");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# positive-vibes manifest"));
        assert!(text.contains("#   - name: code-review"));

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.targets, vec!["vscode-copilot"]);
        assert!(manifest.has_no_resources());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("vibes.yaml"), "targets: [cursor]\n").unwrap();

        let err = handle_init(&ctx(tmp.path()), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        handle_init(&ctx(tmp.path()), true).unwrap();
        let manifest = load_manifest(&tmp.path().join("vibes.yaml")).unwrap();
        assert_eq!(manifest.targets, vec!["vscode-copilot"]);
    }
}

use std::{collections::HashSet, fmt::Write as _, path::Path};

use {anyhow::Result, clap::Subcommand};

use {
    vibes_common::ResourceKind,
    vibes_config::{
        ConfigDiff, Diagnostic, ManifestScope, Severity, diff_manifests, find_project_manifest,
        inspect, load_merged, project_manifest_path, validate_file,
    },
    vibes_registry::EmbeddedRegistry,
};

use crate::{
    Context,
    style::{Palette, palette},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the merged manifest as YAML.
    Show,
    /// Print the manifest and cache locations.
    Paths,
    /// Compare the global and project manifests.
    Diff {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Validate both manifests and check that every entry resolves.
    Validate {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

pub fn handle_config(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(ctx),
        ConfigAction::Paths => {
            paths(ctx);
            Ok(())
        },
        ConfigAction::Diff { json } => diff(ctx, json),
        ConfigAction::Validate { verbose } => validate(ctx, verbose),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let layers = ctx.load_layers()?;
    print!("{}", serde_yaml::to_string(&layers.merged)?);
    Ok(())
}

fn paths(ctx: &Context) {
    let p = palette();
    let project = find_project_manifest(&ctx.project_dir)
        .unwrap_or_else(|| project_manifest_path(&ctx.project_dir));
    for (label, path) in [
        ("project", project.as_path()),
        ("global", ctx.global_path.as_path()),
        ("cache", ctx.cache_root.as_path()),
    ] {
        println!("{}", format_path_line(&p, label, path, path.exists()));
    }
}

fn format_path_line(p: &Palette, label: &str, path: &Path, exists: bool) -> String {
    let state = if exists {
        format!("{}exists{}", p.green, p.reset)
    } else {
        format!("{}missing{}", p.yellow, p.reset)
    };
    format!("{}{label:<8}{} {} ({state})", p.bold, p.reset, path.display())
}

fn diff(ctx: &Context, json: bool) -> Result<()> {
    let layers = ctx.load_layers()?;
    let diff = diff_manifests(
        &layers.global_or_default(),
        &layers.local_or_default(),
        &layers.merged,
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print!("{}", render_diff(&palette(), &diff));
    }
    Ok(())
}

fn list_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn render_diff(p: &Palette, diff: &ConfigDiff) -> String {
    let mut out = String::new();
    let sections = [
        ("registries", &diff.registries),
        (ResourceKind::Skill.plural(), diff.for_kind(ResourceKind::Skill)),
        (
            ResourceKind::Instruction.plural(),
            diff.for_kind(ResourceKind::Instruction),
        ),
        (ResourceKind::Agent.plural(), diff.for_kind(ResourceKind::Agent)),
    ];
    for (label, section) in sections {
        let _ = writeln!(out, "{}{label}{} ({} effective)", p.bold, p.reset, section.effective);
        let _ = writeln!(out, "  global only: {}", list_or_dash(&section.global_only));
        let _ = writeln!(out, "  local only:  {}", list_or_dash(&section.local_only));
        let _ = writeln!(out, "  overridden:  {}", list_or_dash(&section.overrides));
    }
    let _ = writeln!(out, "{}targets{}", p.bold, p.reset);
    let _ = writeln!(out, "  global:    {}", list_or_dash(&diff.targets.global));
    let _ = writeln!(out, "  local:     {}", list_or_dash(&diff.targets.local));
    let _ = writeln!(out, "  effective: {}", list_or_dash(&diff.targets.effective));
    for risky in &diff.risky {
        let _ = writeln!(out, "{}warning{} {risky}", p.yellow, p.reset);
    }
    out
}

fn validate(ctx: &Context, verbose: bool) -> Result<()> {
    let mut diagnostics: Vec<(String, Diagnostic)> = Vec::new();
    let mut checked = Vec::new();

    if let Some(path) = find_project_manifest(&ctx.project_dir) {
        let result = validate_file(&path, ManifestScope::Project);
        let label = path.display().to_string();
        diagnostics.extend(result.diagnostics.into_iter().map(|d| (label.clone(), d)));
        checked.push(path);
    }
    if ctx.global_path.is_file() {
        let result = validate_file(&ctx.global_path, ManifestScope::Global);
        let label = ctx.global_path.display().to_string();
        diagnostics.extend(result.diagnostics.into_iter().map(|d| (label.clone(), d)));
        checked.push(ctx.global_path.clone());
    }
    if checked.is_empty() {
        anyhow::bail!(
            "no vibes.yaml in {} and no global manifest at {} (run `vibes init`)",
            ctx.project_dir.display(),
            ctx.global_path.display()
        );
    }

    for path in &checked {
        eprintln!("Checking {}", path.display());
    }
    eprintln!();

    let syntax_ok = !diagnostics
        .iter()
        .any(|(_, d)| d.severity == Severity::Error && d.category == "syntax");
    if syntax_ok {
        let layers = load_merged(&ctx.project_dir, Some(&ctx.global_path))?;
        let result = inspect(&layers, &EmbeddedRegistry::skill_names());
        diagnostics.extend(
            result
                .diagnostics
                .into_iter()
                .map(|d| ("merged".to_string(), d)),
        );
    }

    let p = palette();
    let mut seen = HashSet::new();
    let mut shown = 0;
    let mut errors = 0;
    let mut warnings = 0;
    for (origin, d) in &diagnostics {
        if !seen.insert((d.severity, d.path.as_str(), d.message.as_str())) {
            continue;
        }
        match d.severity {
            Severity::Error => errors += 1,
            Severity::Warning => warnings += 1,
            Severity::Info if !verbose => continue,
            Severity::Info => {},
        }
        eprintln!("{}", format_diagnostic(&p, origin, d));
        shown += 1;
    }

    if shown > 0 {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn format_diagnostic(p: &Palette, origin: &str, d: &Diagnostic) -> String {
    let (color, label) = match d.severity {
        Severity::Error => (p.red, "error"),
        Severity::Warning => (p.yellow, "warning"),
        Severity::Info => (p.cyan, "info"),
    };
    if d.path.is_empty() {
        format!("  {}{color}{label}{} [{origin}] {}", p.bold, p.reset, d.message)
    } else {
        format!(
            "  {}{color}{label}{} [{origin}] {}: {}",
            p.bold, p.reset, d.path, d.message
        )
    }
}

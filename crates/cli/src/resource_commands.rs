use anyhow::Result;

use {
    vibes_common::ResourceKind,
    vibes_resources::{MutationReport, ResourceDetail, ResourceRow},
};

use crate::{
    Context,
    style::{Palette, palette},
};

fn print_report(p: &Palette, verb: &str, report: &MutationReport) {
    for name in &report.mutated {
        println!("  {}{verb}{} {name}", p.green, p.reset);
    }
    for name in &report.skipped_duplicates {
        println!("  {}skipped{} {name} (duplicate)", p.cyan, p.reset);
    }
    for error in &report.errors {
        eprintln!("  {}{}error{} {error}", p.bold, p.red, p.reset);
    }
    if report.mutated.is_empty() && report.errors.is_empty() && report.skipped_duplicates.is_empty()
    {
        println!("Nothing to do.");
    }
}

fn finish(report: &MutationReport) {
    if report.has_errors() {
        std::process::exit(1);
    }
}

pub async fn handle_install(
    ctx: &Context,
    kind: ResourceKind,
    names: &[String],
    global: bool,
) -> Result<()> {
    let report = ctx.service(global).install(kind, names).await?;
    print_report(&palette(), "added", &report);
    finish(&report);
    Ok(())
}

pub fn handle_remove(
    ctx: &Context,
    kind: ResourceKind,
    names: &[String],
    global: bool,
) -> Result<()> {
    let report = ctx.service(global).remove(kind, names)?;
    print_report(&palette(), "removed", &report);
    finish(&report);
    Ok(())
}

fn format_row(p: &Palette, row: &ResourceRow) -> String {
    let marker = if row.installed {
        format!("{}*{}", p.green, p.reset)
    } else {
        " ".to_string()
    };
    let mut line = format!("{marker} {}{}{}", p.bold, row.name, p.reset);
    match (row.registry.as_deref(), row.path.as_deref()) {
        (Some(registry), Some(path)) => line.push_str(&format!("  ({registry}: {path})")),
        (Some(registry), None) => line.push_str(&format!("  ({registry})")),
        (None, Some(path)) => line.push_str(&format!("  ({path})")),
        (None, None) => {},
    }
    line
}

pub async fn handle_list(ctx: &Context, kind: ResourceKind, available: bool) -> Result<()> {
    let service = ctx.service(false);
    let rows = if available {
        service.list_available(kind).await?
    } else {
        service.list_installed(kind)?
    };

    if rows.is_empty() {
        let what = if available {
            "available"
        } else {
            "declared"
        };
        println!("No {what} {}.", kind.plural());
        return Ok(());
    }

    let p = palette();
    for row in &rows {
        println!("{}", format_row(&p, row));
    }
    Ok(())
}

fn format_detail(p: &Palette, detail: &ResourceDetail) -> String {
    let mut out = format!("{}{} {}{}\n", p.bold, detail.kind, detail.name, p.reset);
    let installed = if detail.installed {
        "yes"
    } else {
        "no"
    };
    out.push_str(&format!("  installed:   {installed}\n"));
    let fields = [
        ("registry", &detail.registry),
        ("path", &detail.path),
        ("version", &detail.version),
        ("description", &detail.description),
        ("applyTo", &detail.apply_to),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            out.push_str(&format!("  {:<12} {value}\n", format!("{label}:")));
        }
    }
    if let Some(ref content) = detail.content {
        out.push_str("  content:\n");
        for line in content.lines() {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

pub async fn handle_show(ctx: &Context, kind: ResourceKind, name: &str) -> Result<()> {
    let detail = ctx.service(false).show(kind, name).await?;
    print!("{}", format_detail(&palette(), &detail));
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::style::PLAIN};

    #[test]
    fn rows_mark_installed() {
        let row = ResourceRow {
            name: "code-review".into(),
            installed: true,
            registry: Some("embedded".into()),
            path: None,
        };
        assert_eq!(format_row(&PLAIN, &row), "* code-review  (embedded)");

        let row = ResourceRow {
            name: "style".into(),
            installed: false,
            registry: Some("team".into()),
            path: Some("code-review/style.instructions.md".into()),
        };
        assert_eq!(
            format_row(&PLAIN, &row),
            "  style  (team: code-review/style.instructions.md)"
        );
    }

    #[test]
    fn detail_lists_known_fields() {
        let detail = ResourceDetail {
            kind: ResourceKind::Instruction,
            name: "tone".into(),
            installed: true,
            registry: None,
            path: None,
            description: None,
            version: None,
            content: Some("Be kind.\nBe brief.".into()),
            apply_to: Some("**/*.rs".into()),
        };
        let text = format_detail(&PLAIN, &detail);
        assert!(text.starts_with("instruction tone\n"));
        assert!(text.contains("  installed:   yes\n"));
        assert!(text.contains("  applyTo:     **/*.rs\n"));
        assert!(text.contains("    Be kind.\n    Be brief.\n"));
        assert!(!text.contains("registry:"));
    }
}

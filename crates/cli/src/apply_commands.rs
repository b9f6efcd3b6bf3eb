use anyhow::Result;

use {
    tracing::info,
    vibes_apply::{ApplyOp, ApplyOptions, ApplyResult, OpStatus, apply},
    vibes_registry::RegistrySet,
};

use crate::{
    Context,
    style::{Palette, palette},
};

fn status_color(p: &Palette, status: OpStatus) -> &'static str {
    match status {
        OpStatus::Installed => p.green,
        OpStatus::Skipped => p.cyan,
        OpStatus::NotFound => p.yellow,
        OpStatus::Error => p.red,
    }
}

fn format_op(p: &Palette, op: &ApplyOp) -> String {
    let mut line = format!(
        "  {}{:<9}{} {:<11} {}",
        status_color(p, op.status),
        op.status.as_str(),
        p.reset,
        op.kind.as_str(),
        op.name
    );
    if let Some(ref target) = op.target {
        line.push_str(" -> ");
        line.push_str(target);
    }
    if let Some(ref error) = op.error {
        line.push_str(": ");
        line.push_str(error);
    }
    line
}

fn print_result(result: &ApplyResult) {
    let p = palette();
    for op in &result.ops {
        println!("{}", format_op(&p, op));
    }
    let color = if result.has_failures() {
        p.red
    } else {
        p.green
    };
    println!("{}{color}{}{}", p.bold, result.summary(), p.reset);
}

pub async fn handle_apply(ctx: &Context, force: bool, link: bool, refresh: bool) -> Result<()> {
    let layers = ctx.load_layers()?;
    let registries = RegistrySet::from_manifest(&layers.merged, &ctx.cache_root)?;
    info!(
        registries = registries.len(),
        targets = layers.merged.targets.len(),
        "applying manifest"
    );

    let result = apply(
        &layers.merged,
        &ctx.project_dir,
        &registries,
        ApplyOptions {
            force,
            link,
            refresh,
        },
    )
    .await?;

    print_result(&result);
    if result.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::style::PLAIN, vibes_common::ResourceKind};

    #[test]
    fn formats_ops() {
        let installed = ApplyOp {
            name: "code-review".into(),
            target: Some("cursor".into()),
            kind: ResourceKind::Skill,
            status: OpStatus::Installed,
            error: None,
        };
        assert_eq!(
            format_op(&PLAIN, &installed),
            "  installed skill       code-review -> cursor"
        );

        let missing = ApplyOp {
            name: "ghost".into(),
            target: None,
            kind: ResourceKind::Agent,
            status: OpStatus::NotFound,
            error: Some("agent 'ghost' not found".into()),
        };
        assert_eq!(
            format_op(&PLAIN, &missing),
            "  not_found agent       ghost: agent 'ghost' not found"
        );
    }
}

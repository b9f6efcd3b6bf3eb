use vibes_common::TargetKind;

use crate::Target;

/// GitHub Copilot in VS Code: `.vscode-copilot/{skills,instructions,agents}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VscodeCopilot;

impl Target for VscodeCopilot {
    fn kind(&self) -> TargetKind {
        TargetKind::VscodeCopilot
    }

    fn root(&self) -> &'static str {
        ".vscode-copilot"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::InstallOptions, std::path::Path};

    #[test]
    fn paths() {
        let project = Path::new("/p");
        assert_eq!(
            VscodeCopilot.skill_dir("review", project),
            Path::new("/p/.vscode-copilot/skills/review")
        );
        assert_eq!(
            VscodeCopilot.instruction_path("ts", project),
            Path::new("/p/.vscode-copilot/instructions/ts.md")
        );
        assert_eq!(
            VscodeCopilot.agent_path("rev", project),
            Path::new("/p/.vscode-copilot/agents/rev.md")
        );
    }

    #[test]
    fn inline_instruction_is_written_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = VscodeCopilot
            .install_instruction(
                "ts",
                Some("Use TypeScript"),
                None,
                tmp.path(),
                InstallOptions::default(),
            )
            .unwrap();
        assert_eq!(dest, tmp.path().join(".vscode-copilot/instructions/ts.md"));
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "Use TypeScript");
    }
}

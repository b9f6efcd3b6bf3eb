use vibes_common::TargetKind;

use crate::Target;

/// OpenCode: `.opencode/{skills,instructions,agents}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opencode;

impl Target for Opencode {
    fn kind(&self) -> TargetKind {
        TargetKind::Opencode
    }

    fn root(&self) -> &'static str {
        ".opencode"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::path::Path};

    #[test]
    fn paths() {
        let project = Path::new("/p");
        assert_eq!(
            Opencode.skill_dir("x", project),
            Path::new("/p/.opencode/skills/x")
        );
        assert_eq!(
            Opencode.instruction_path("x", project),
            Path::new("/p/.opencode/instructions/x.md")
        );
        assert_eq!(
            Opencode.agent_path("x", project),
            Path::new("/p/.opencode/agents/x.md")
        );
    }
}

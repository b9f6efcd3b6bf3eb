use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Resource kinds ──────────────────────────────────────────────────────────

/// The three kinds of artifacts a manifest can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Skill,
    Instruction,
    Agent,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Instruction => "instruction",
            Self::Agent => "agent",
        }
    }

    /// Manifest key and directory name for this kind (`skills`, ...).
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Instruction => "instructions",
            Self::Agent => "agents",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" | "skills" => Ok(Self::Skill),
            "instruction" | "instructions" => Ok(Self::Instruction),
            "agent" | "agents" => Ok(Self::Agent),
            other => Err(Error::validation(format!(
                "unknown resource kind \"{other}\"; expected one of: skills, instructions, agents"
            ))),
        }
    }
}

// ── Targets ─────────────────────────────────────────────────────────────────

/// Supported AI tools whose on-disk layout we know how to populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    VscodeCopilot,
    Opencode,
    Cursor,
}

impl TargetKind {
    pub const ALL: [Self; 3] = [Self::VscodeCopilot, Self::Opencode, Self::Cursor];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VscodeCopilot => "vscode-copilot",
            Self::Opencode => "opencode",
            Self::Cursor => "cursor",
        }
    }

    /// Identifiers of every supported target, in declaration order.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }

    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        Self::ALL.iter().any(|t| t.as_str() == name)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::validation(format!(
                    "unknown target \"{s}\"; expected one of: {}",
                    Self::names().join(", ")
                ))
            })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("skills", ResourceKind::Skill)]
    #[case("skill", ResourceKind::Skill)]
    #[case("instructions", ResourceKind::Instruction)]
    #[case("agent", ResourceKind::Agent)]
    fn resource_kind_accepts_singular_and_plural(
        #[case] input: &str,
        #[case] expected: ResourceKind,
    ) {
        assert_eq!(input.parse::<ResourceKind>().unwrap(), expected);
    }

    #[test]
    fn resource_kind_rejects_unknown() {
        assert!("prompts".parse::<ResourceKind>().is_err());
    }

    #[rstest]
    #[case("vscode-copilot", TargetKind::VscodeCopilot)]
    #[case("opencode", TargetKind::Opencode)]
    #[case("cursor", TargetKind::Cursor)]
    fn target_kind_round_trips_identifier(#[case] input: &str, #[case] expected: TargetKind) {
        let parsed: TargetKind = input.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.as_str(), input);
    }

    #[test]
    fn unknown_target_lists_supported_set() {
        let err = "claude".parse::<TargetKind>().unwrap_err();
        assert!(err.to_string().contains("vscode-copilot, opencode, cursor"));
        assert!(!TargetKind::is_valid("claude"));
    }
}

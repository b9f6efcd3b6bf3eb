use serde::Serialize;

use vibes_common::ResourceKind;

/// Outcome of one resource on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Installed,
    Skipped,
    Error,
    NotFound,
}

impl OpStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Skipped => "skipped",
            Self::Error => "error",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for OpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the apply trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOp {
    pub name: String,
    /// `None` when the resource failed to resolve, before any target.
    pub target: Option<String>,
    pub kind: ResourceKind,
    pub status: OpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl std::fmt::Display for ApplyOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(target) = &self.target {
            write!(f, " -> {target}")?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }
        Ok(())
    }
}

/// Counters, aggregated errors, and the ordered op trace of one apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub installed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub ops: Vec<ApplyOp>,
}

impl ApplyResult {
    #[must_use]
    pub fn count(&self, status: OpStatus) -> usize {
        self.ops.iter().filter(|op| op.status == status).count()
    }

    /// Whether anything failed or could not be found.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.count(OpStatus::NotFound) > 0
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} installed, {} skipped, {} not found, {} errors",
            self.installed,
            self.skipped,
            self.count(OpStatus::NotFound),
            self.errors.len()
        )
    }

    pub(crate) fn push(
        &mut self,
        kind: ResourceKind,
        name: &str,
        target: Option<&str>,
        status: OpStatus,
        error: Option<String>,
    ) {
        match status {
            OpStatus::Installed => self.installed += 1,
            OpStatus::Skipped => self.skipped += 1,
            OpStatus::Error => {
                let message = error.as_deref().unwrap_or("unknown error");
                self.errors.push(match target {
                    Some(target) => format!("{kind} '{name}' -> {target}: {message}"),
                    None => format!("{kind} '{name}': {message}"),
                });
            },
            OpStatus::NotFound => {},
        }
        self.ops.push(ApplyOp {
            name: name.to_string(),
            target: target.map(String::from),
            kind,
            status,
            error,
        });
    }
}

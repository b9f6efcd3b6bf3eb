use std::path::Path;

use vibes_common::{Error, Result};

use crate::types::Skill;

pub const SKILL_FILE: &str = "SKILL.md";

const DELIMITER: &str = "---";

/// Split a resource file into `(frontmatter, body)`.
///
/// The frontmatter is optional; when present it must open on the first line
/// and close on a line of its own. The body is returned verbatim.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str)> {
    let Some(after_open) = strip_delimiter_line(content) else {
        return Ok((None, content));
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let frontmatter = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok((Some(frontmatter), body));
        }
        offset += line.len();
    }

    Err(Error::parse("frontmatter", "missing closing --- delimiter"))
}

/// Returns the rest of `content` if its first line is exactly `---`.
fn strip_delimiter_line(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Parse a skill file into its typed record.
pub fn parse_skill(content: &str) -> Result<Skill> {
    let (frontmatter, body) = split_frontmatter(content)?;

    let frontmatter = frontmatter.unwrap_or_default();
    if frontmatter.trim().is_empty() {
        return Err(Error::validation("skill frontmatter is missing a name"));
    }

    let mut skill: Skill = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::parse("skill frontmatter", e))?;

    if skill.name.trim().is_empty() {
        return Err(Error::validation("skill frontmatter is missing a name"));
    }

    skill.instructions = body.to_string();
    Ok(skill)
}

/// Read and parse a skill file from disk.
pub fn load_skill_file(path: &Path) -> Result<Skill> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
    parse_skill(&content).map_err(|e| match e {
        Error::Parse { message, .. } => Error::parse(path.display().to_string(), message),
        Error::Validation(message) => {
            Error::validation(format!("{}: {message}", path.display()))
        },
        other => other,
    })
}

/// Load `<dir>/SKILL.md`. A missing file is reported as a not-found skill.
pub fn load_skill_dir(dir: &Path) -> Result<Skill> {
    let skill_md = dir.join(SKILL_FILE);
    if !skill_md.is_file() {
        return Err(Error::not_found("skill", dir.display().to_string()));
    }
    tracing::debug!(path = %skill_md.display(), "loading skill");
    load_skill_file(&skill_md)
}

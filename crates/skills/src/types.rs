use serde::{Deserialize, Serialize};

/// A resolved skill: frontmatter fields plus the markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Markdown body after the frontmatter, kept byte-for-byte.
    #[serde(skip)]
    pub instructions: String,
}

impl Skill {
    /// Render back to `SKILL.md` form. Parsing the output yields an equal
    /// record.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let frontmatter = serde_yaml::to_string(self)?;
        Ok(format!("---\n{frontmatter}---\n{}", self.instructions))
    }
}

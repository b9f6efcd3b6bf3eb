//! Skill files: parsing and rendering.
//!
//! A skill is a directory containing a `SKILL.md` file with optional YAML
//! frontmatter (delimited by `---` lines) followed by markdown instructions.

pub mod parse;
pub mod types;

pub use {
    parse::{SKILL_FILE, load_skill_dir, load_skill_file, parse_skill, split_frontmatter},
    types::Skill,
};

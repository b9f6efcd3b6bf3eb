//! Skill registries.
//!
//! A registry lists and fetches skills. The embedded registry serves skills
//! compiled into the binary; git registries serve cached clones of remote
//! repositories and can also hand out individual instruction and agent
//! files.

pub mod embedded;
pub mod git;
pub mod set;
pub mod source;

pub use {
    embedded::EmbeddedRegistry,
    git::{GitRegistry, RefKind, classify_ref},
    set::RegistrySet,
    source::{FetchedSkill, FileSource, Registry, ResourceSource, sanitize_relative_path},
};

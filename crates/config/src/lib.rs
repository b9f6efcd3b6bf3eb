//! Manifest loading, validation, layering, and inspection.
//!
//! Manifest files: `vibes.yaml` (preferred) or the legacy `vibes.yml`, in the
//! project directory, optionally layered over a user-global
//! `~/.config/positive-vibes/vibes.yaml`. Local entries override global ones
//! by name.

pub mod diff;
pub mod inspect;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod validate;

pub use {
    diff::{ConfigDiff, OverrideReport, RiskyOverride, compute_overrides, diff_manifests},
    inspect::inspect,
    loader::{
        Layers, MANIFEST_FILENAMES, find_project_manifest, load_from_project, load_manifest,
        load_merged, project_manifest_path, read_header, resolve_relative_paths, save_manifest,
    },
    merge::merge_manifests,
    schema::{
        AgentRef, AgentSource, EMBEDDED_REGISTRY, InstructionRef, InstructionSource, LATEST_REF,
        Manifest, Named, RegistryPaths, RegistryRef, SkillRef, SkillSource, split_inner_path,
    },
    validate::{
        Diagnostic, ManifestScope, Severity, ValidationResult, check_manifest, validate_file,
        validate_manifest,
    },
};

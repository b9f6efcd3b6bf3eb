use vibes_common::TargetKind;

use crate::Target;

/// Cursor: `.cursor/{skills,instructions,agents}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor;

impl Target for Cursor {
    fn kind(&self) -> TargetKind {
        TargetKind::Cursor
    }

    fn root(&self) -> &'static str {
        ".cursor"
    }
}

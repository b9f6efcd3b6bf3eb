//! The apply engine: resolve every manifest entry through the registries and
//! materialize it into each target's layout inside the project.

mod engine;
mod result;

pub use {
    engine::{ApplyOptions, apply},
    result::{ApplyOp, ApplyResult, OpStatus},
};

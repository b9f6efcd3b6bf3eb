//! Resource service: list, show, install, and remove skills, instructions,
//! and agents in a manifest.

mod report;
mod service;

pub use {
    report::{MutationReport, ResourceDetail, ResourceRow},
    service::{ResourceService, Scope},
};

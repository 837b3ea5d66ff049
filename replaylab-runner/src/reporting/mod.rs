//! Reporting: text summary and artifact export.

pub mod artifacts;
pub mod summary;

pub use artifacts::{ArtifactManager, ArtifactPaths};
pub use summary::{format_currency, render_summary, NOT_ENOUGH_DATA};

//! # OrthoNet I/O
//!
//! Reads and writes the `.onet.json` document format: human-readable JSON
//! holding project metadata, editor settings, owner placements and the
//! persisted wire list exchanged with the engine.

pub mod document;
pub mod project;

pub use document::{DocumentError, OwnerPlacement, SchematicDocument, FORMAT_VERSION};
pub use project::{ProjectMeta, ProjectSettings};

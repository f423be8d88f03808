//! The `.onet.json` document: metadata, settings, owner placements and the
//! persisted wire list.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use orthonet_core::{EngineError, OwnerId, PersistedWire, PinDefinition, Transform, WireEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::{ProjectMeta, ProjectSettings};

/// Newest format version this crate reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(u32),

    #[error("Engine rejected document contents: {0}")]
    Engine(#[from] EngineError),
}

/// Where a symbol or footprint sits and where its pins are, so a document
/// can place its pin vertices without the symbol library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerPlacement {
    pub owner: OwnerId,
    #[serde(default)]
    pub transform: Transform,
    pub pins: Vec<PinDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicDocument {
    pub version: u32,
    pub meta: ProjectMeta,
    #[serde(default)]
    pub settings: ProjectSettings,
    #[serde(default)]
    pub placements: Vec<OwnerPlacement>,
    #[serde(default)]
    pub wires: Vec<PersistedWire>,
}

impl SchematicDocument {
    pub fn new(name: &str) -> Self {
        Self {
            version: FORMAT_VERSION,
            meta: ProjectMeta::new(name),
            settings: ProjectSettings::default(),
            placements: Vec::new(),
            wires: Vec::new(),
        }
    }

    /// Build an engine from this document: load the wires, then place every
    /// owner's pins.
    pub fn open_engine(&self) -> Result<WireEngine, DocumentError> {
        let mut engine = WireEngine::new(self.settings.engine_config());
        engine.load(&self.wires);
        for placement in &self.placements {
            engine.sync_pins(
                placement.owner,
                placement.transform,
                placement.pins.clone(),
            )?;
        }
        Ok(engine)
    }

    /// Replace the stored wires with the engine's current graph.
    pub fn capture(&mut self, engine: &WireEngine) {
        self.wires = engine.export();
        self.settings = ProjectSettings::from(engine.config());
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, DocumentError> {
        let doc: SchematicDocument = serde_json::from_reader(reader)?;
        if doc.version > FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion(doc.version));
        }
        Ok(doc)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), DocumentError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let doc = Self::read_from(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded '{}' from {}: {} wires, {} placements",
            doc.meta.name,
            path.display(),
            doc.wires.len(),
            doc.placements.len()
        );
        Ok(doc)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        log::info!("Saved '{}' to {}", self.meta.name, path.display());
        Ok(())
    }
}

//! Configuration types for Tessera mapping.
//!
//! These structures control how documents are read and written. All types
//! implement [`serde::Deserialize`] for loading from external sources.
//!
//! # Overview
//!
//! - [`MapperConfig`] - Top-level configuration combining read and write settings.
//! - [`ReadConfig`] - Controls how strictly documents are matched against the registry.
//! - [`WriteConfig`] - Controls id synthesis and the XML declaration.
//!
//! # Example
//!
//! ```
//! # use tessera::config::MapperConfig;
//! let config = MapperConfig::default();
//! assert!(!config.read().strict());
//! assert!(config.write().xml_declaration());
//! ```

use serde::Deserialize;

use tessera_xml::{ReadOptions, WriteOptions};

/// Top-level mapper configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapperConfig {
    /// Read configuration section.
    #[serde(default)]
    read: ReadConfig,

    /// Write configuration section.
    #[serde(default)]
    write: WriteConfig,
}

impl MapperConfig {
    /// Creates a new [`MapperConfig`] with the specified read and write configurations.
    pub fn new(read: ReadConfig, write: WriteConfig) -> Self {
        Self { read, write }
    }

    /// Returns the read configuration.
    pub fn read(&self) -> &ReadConfig {
        &self.read
    }

    /// Returns the write configuration.
    pub fn write(&self) -> &WriteConfig {
        &self.write
    }
}

/// Read settings.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReadConfig {
    /// Fail on unknown content instead of keeping it with a warning.
    #[serde(default)]
    strict: bool,
}

impl ReadConfig {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// The reader options for a whole document or a fragment.
    pub fn options(&self, fragment: bool) -> ReadOptions {
        ReadOptions::default()
            .with_strict(self.strict)
            .with_fragment(fragment)
    }
}

/// Write settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteConfig {
    /// Give referenced instances without an id a generated one.
    #[serde(default)]
    synthesize_ids: bool,

    /// Start documents with `<?xml version="1.0" encoding="UTF-8"?>`.
    #[serde(default = "default_xml_declaration")]
    xml_declaration: bool,
}

impl WriteConfig {
    /// Creates a new [`WriteConfig`].
    ///
    /// # Arguments
    ///
    /// * `synthesize_ids` - Generate ids for referenced instances lacking one.
    /// * `xml_declaration` - Emit the XML declaration.
    pub fn new(synthesize_ids: bool, xml_declaration: bool) -> Self {
        Self {
            synthesize_ids,
            xml_declaration,
        }
    }

    pub fn synthesize_ids(&self) -> bool {
        self.synthesize_ids
    }

    pub fn xml_declaration(&self) -> bool {
        self.xml_declaration
    }

    /// The writer options these settings describe.
    pub fn options(&self) -> WriteOptions {
        WriteOptions::default()
            .with_synthesize_ids(self.synthesize_ids)
            .with_xml_declaration(self.xml_declaration)
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            synthesize_ids: false,
            xml_declaration: default_xml_declaration(),
        }
    }
}

fn default_xml_declaration() -> bool {
    true
}

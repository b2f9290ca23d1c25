//! Tessera - schema-driven mapping between XML documents and typed object graphs.
//!
//! Meta-model descriptors, one JSON document per namespace, are merged into a
//! [`Registry`]. A [`Mapper`] shares that registry and reads documents into
//! graphs of [`ObjectRef`] instances or writes such graphs back as markup.

pub mod config;

mod error;

pub use tessera_core::{
    Instance, ObjectRef, PrimitiveType, Reference, Registry, RegistryBuilder, Scalar,
    SchemaError, Value, WeakObjectRef, descriptor, extension,
};
pub use tessera_xml::{
    Diagnostic, Document, ErrorKind, MappingError, Span,
    error::{ErrorCode, Label, Severity},
};

pub use error::TesseraError;

use std::{fs, path::Path, sync::Arc};

use log::{debug, info};

use tessera_xml::{Reader, Writer};

use config::MapperConfig;

/// Reads and writes documents against a shared registry.
///
/// # Examples
///
/// ```
/// use tessera::Mapper;
///
/// let mapper = Mapper::from_descriptors([r#"{
///     "name": "Notes", "uri": "urn:notes", "prefix": "n",
///     "types": [ { "name": "Note", "properties": [
///         { "name": "id", "type": "String" },
///         { "name": "text", "type": "String", "kind": "body" } ] } ]
/// }"#])
/// .expect("Failed to load descriptors");
///
/// let document = mapper
///     .read(r#"<n:Note xmlns:n="urn:notes" id="n1">Hello</n:Note>"#, Some("n:Note"))
///     .expect("Failed to read");
/// let xml = mapper.write(document.root()).expect("Failed to write");
/// assert!(xml.ends_with(r#"<n:Note xmlns:n="urn:notes" id="n1">Hello</n:Note>"#));
/// ```
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: Arc<Registry>,
    config: MapperConfig,
}

impl Mapper {
    /// Create a mapper with the default configuration.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, MapperConfig::default())
    }

    /// Create a mapper with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `registry` - The registry shared by every read and write
    /// * `config` - Read and write settings
    pub fn with_config(registry: Arc<Registry>, config: MapperConfig) -> Self {
        Self { registry, config }
    }

    /// Build a registry from descriptor JSON texts.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Schema`] if a descriptor is malformed or the
    /// descriptors conflict.
    pub fn from_descriptors<I, S>(descriptors: I) -> Result<Self, TesseraError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Registry::builder();
        for descriptor in descriptors {
            builder = builder.register_json(descriptor.as_ref())?;
        }
        Ok(Self::new(Arc::new(builder.build()?)))
    }

    /// Build a registry from descriptor files.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Io`] if a file cannot be read and
    /// [`TesseraError::Schema`] if the descriptors do not form a registry.
    pub fn from_files<I, P>(paths: I, config: MapperConfig) -> Result<Self, TesseraError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut builder = Registry::builder();
        for path in paths {
            let path = path.as_ref();
            debug!(path = path.display().to_string(); "Loading descriptor");
            builder = builder.register_json(&fs::read_to_string(path)?)?;
        }
        Ok(Self::with_config(Arc::new(builder.build()?), config))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Read a document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The document text
    /// * `root` - Qualified name the root element's type must be, or a supertype of
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Read`] with the document text attached. For
    /// dangling references, [`TesseraError::unresolved_ids`] lists every id
    /// that was not found.
    pub fn read(&self, xml: &str, root: Option<&str>) -> Result<Document, TesseraError> {
        info!(root:?; "Reading document");
        self.read_with(xml, root, false)
    }

    /// Read a document fragment.
    ///
    /// References to ids outside the fragment stay unresolved placeholders
    /// instead of failing the read.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Read`] for the same reasons as [`Mapper::read`]
    /// except dangling references.
    pub fn read_fragment(&self, xml: &str, root: &str) -> Result<Document, TesseraError> {
        info!(root; "Reading fragment");
        self.read_with(xml, Some(root), true)
    }

    /// Write the graph rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Write`] if the graph does not fit the registry.
    pub fn write(&self, root: &ObjectRef) -> Result<String, TesseraError> {
        Writer::new(&self.registry, self.config.write().options())
            .write(root)
            .map_err(TesseraError::Write)
    }

    fn read_with(&self, xml: &str, root: Option<&str>, fragment: bool) -> Result<Document, TesseraError> {
        let document = Reader::new(&self.registry, self.config.read().options(fragment))
            .read(xml, root)
            .map_err(|err| TesseraError::new_read_error(err, xml))?;

        debug!(warnings = document.warnings().len(); "Document mapped");
        Ok(document)
    }
}

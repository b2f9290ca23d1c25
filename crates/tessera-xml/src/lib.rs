//! Schema-driven XML reading and writing for Tessera.
//!
//! [`Reader`] turns a document into an instance graph typed by a
//! [`tessera_core::Registry`]; [`Writer`] turns a graph back into markup. Both
//! report problems as [`Diagnostic`]s with byte spans into the source,
//! wrapped in a [`MappingError`].
//!
//! # Example
//!
//! ```
//! use tessera_core::Registry;
//! use tessera_xml::{ReadOptions, Reader, WriteOptions, Writer};
//!
//! let registry = Registry::builder()
//!     .register_json(r##"{ "name": "Tasks", "uri": "urn:tasks", "prefix": "t",
//!         "types": [
//!             { "name": "Board", "properties": [
//!                 { "name": "tasks", "type": "Task", "isMany": true, "style": "type" } ] },
//!             { "name": "Task", "properties": [
//!                 { "name": "id", "type": "String" },
//!                 { "name": "after", "type": "Task", "kind": "reference" } ] } ] }"##)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let xml = r##"<t:Board xmlns:t="urn:tasks"><t:Task id="b" after="#a"/><t:Task id="a"/></t:Board>"##;
//! let document = Reader::new(&registry, ReadOptions::default())
//!     .read(xml, Some("t:Board"))
//!     .unwrap();
//!
//! let written = Writer::new(&registry, WriteOptions::default().with_xml_declaration(false))
//!     .write(document.root())
//!     .unwrap();
//! assert_eq!(written, xml);
//! ```

pub mod error;

mod extension;
mod namespace;
mod options;
mod reader;
mod references;
mod span;
mod writer;

pub use error::{Diagnostic, ErrorKind, MappingError};
pub use options::{ReadOptions, WriteOptions};
pub use reader::{Document, Reader};
pub use span::Span;
pub use writer::Writer;

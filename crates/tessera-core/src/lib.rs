//! Tessera Core Types and Definitions
//!
//! This crate provides the meta-model side of the Tessera mapping engine. It
//! includes:
//!
//! - **Descriptors**: The serde-loadable meta-model format ([`descriptor`] module)
//! - **Registry**: Queryable type and property metadata with inheritance,
//!   namespace prefixes and composition resolved ([`registry::Registry`])
//! - **Instances**: Typed, in-memory model objects ([`instance`] module)
//! - **Values**: Scalars, references and extension content ([`value`] module)

pub mod descriptor;
pub mod error;
pub mod extension;
pub mod instance;
pub mod qname;
pub mod registry;
pub mod value;

mod snapshot;

pub use error::SchemaError;
pub use instance::{Instance, ObjectRef, WeakObjectRef};
pub use registry::{Registry, RegistryBuilder};
pub use value::{PrimitiveType, Reference, Scalar, Value};

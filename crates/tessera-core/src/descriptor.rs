//! The meta-model descriptor format.
//!
//! One [`PackageDescriptor`] describes one namespace: its URI, preferred
//! prefix, the types it defines and the properties it layers onto types of
//! other namespaces. Descriptors are plain data and deserialize from JSON.
//!
//! # Example
//!
//! ```
//! use tessera_core::descriptor::PackageDescriptor;
//!
//! let package = PackageDescriptor::from_json(r#"{
//!     "name": "DC",
//!     "uri": "http://www.omg.org/spec/DMN/20180521/DC/",
//!     "prefix": "dc",
//!     "types": [
//!         {
//!             "name": "Point",
//!             "properties": [
//!                 { "name": "x", "type": "Real" },
//!                 { "name": "y", "type": "Real" }
//!             ]
//!         }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(package.prefix, "dc");
//! assert_eq!(package.types[0].properties.len(), 2);
//! ```

use serde::Deserialize;

use crate::error::SchemaError;

/// Descriptor of one namespace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Human-readable package name.
    pub name: String,

    /// Namespace URI.
    pub uri: String,

    /// Preferred prefix for the namespace.
    pub prefix: String,

    /// Request that `prefix` becomes the canonical prefix even if another
    /// descriptor registered the same URI first.
    #[serde(default)]
    pub canonical_prefix: bool,

    /// Markup naming options.
    #[serde(default)]
    pub xml: Option<XmlOptions>,

    /// Types defined in this namespace.
    #[serde(default)]
    pub types: Vec<TypeDefinition>,

    /// Properties added to types defined elsewhere.
    #[serde(default)]
    pub extends: Vec<ExtensionDefinition>,
}

impl PackageDescriptor {
    /// Deserialize a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] if the text is not a valid descriptor.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Markup naming options of a package.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlOptions {
    #[serde(default)]
    pub tag_alias: Option<TagAlias>,
}

/// How type names map to element names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagAlias {
    /// Element names equal type names.
    #[default]
    None,
    /// Element names are type names with the first letter lowercased.
    LowerCase,
}

impl TagAlias {
    /// Apply the alias to a type's local name.
    pub fn apply(self, local: &str) -> String {
        match self {
            Self::None => local.to_string(),
            Self::LowerCase => {
                let mut chars = local.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Definition of one type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    /// Local type name.
    pub name: String,

    /// Supertype, either local or `prefix:Name`.
    #[serde(default)]
    pub super_class: Option<String>,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

/// Properties one package adds to a type of another package.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDefinition {
    /// The extended type, `prefix:Name`.
    #[serde(rename = "type")]
    pub target: String,

    pub properties: Vec<PropertyDefinition>,
}

/// Definition of one property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,

    /// A primitive name, `any`, or a type name (local or `prefix:Name`).
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub is_many: bool,

    /// Serialization kind; inferred from the type when omitted.
    #[serde(default)]
    pub kind: Option<SerializationKind>,

    /// Marks the property holding the instance's identity.
    #[serde(default)]
    pub is_id: bool,

    /// Default value of a primitive property.
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    /// Element naming for element properties.
    #[serde(default)]
    pub style: ElementStyle,

    /// Markup encoding for reference properties.
    #[serde(default)]
    pub reference_encoding: ReferenceEncoding,
}

/// Where a property lives in markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerializationKind {
    /// An XML attribute.
    Attribute,
    /// One child element per value.
    Element,
    /// The element's text content.
    Body,
    /// The id of another instance, resolved after parsing.
    Reference,
}

/// How child elements of an element property are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementStyle {
    /// Each value is an element named after the property.
    #[default]
    Property,
    /// Each value is an element named after its own type.
    Type,
    /// One element named after the property wraps type-named values.
    Wrapped,
}

/// How reference values are spelled in markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceEncoding {
    /// An attribute holding `#id`.
    #[default]
    Fragment,
    /// An attribute holding the bare id.
    Bare,
    /// A property-named child element with an `href="#id"` attribute.
    Element,
}

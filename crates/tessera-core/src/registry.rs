//! The type registry.
//!
//! A [`Registry`] is built once from [`PackageDescriptor`]s and is immutable
//! afterward. It answers every structural question the XML reader and writer
//! ask: which types exist, which properties a type has once inheritance is
//! applied, how names map to namespaces and element tags, and which property
//! carries an instance's identity.
//!
//! # Overview
//!
//! - [`RegistryBuilder`] - Collects descriptors and merges them.
//! - [`TypeDescriptor`] - One type, with its own (and extended) properties.
//! - [`PropertyDescriptor`] - One property with its serialization shape.
//! - [`Namespace`] - A namespace URI and its canonical prefix.
//!
//! # Example
//!
//! ```
//! use tessera_core::{Registry, descriptor::PackageDescriptor};
//!
//! let package = PackageDescriptor::from_json(r#"{
//!     "name": "Shapes", "uri": "urn:shapes", "prefix": "s",
//!     "types": [
//!         { "name": "Shape", "isAbstract": true,
//!           "properties": [ { "name": "id", "type": "String", "isId": true } ] },
//!         { "name": "Circle", "superClass": "Shape",
//!           "properties": [ { "name": "radius", "type": "Real" } ] }
//!     ]
//! }"#).unwrap();
//!
//! let registry = Registry::builder().register(package).build().unwrap();
//! let circle = registry.resolve_type("s:Circle").unwrap();
//! let names: Vec<&str> = registry
//!     .effective_properties(circle)
//!     .iter()
//!     .map(|property| property.name())
//!     .collect();
//! assert_eq!(names, vec!["id", "radius"]);
//! ```

mod builder;

pub use builder::RegistryBuilder;

use std::{collections::HashMap, sync::OnceLock};

use indexmap::IndexMap;
use log::trace;

use crate::{
    descriptor::{ElementStyle, ReferenceEncoding, SerializationKind, TagAlias},
    error::SchemaError,
    instance::{Instance, ObjectRef},
    qname::QName,
    value::{PrimitiveType, Scalar, Value},
};

/// The URI of the XML Schema instance namespace (`xsi:type`).
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    uri: String,
    prefix: String,
    tag_alias: TagAlias,
}

impl Namespace {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The prefix the writer always emits for this namespace.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tag_alias(&self) -> TagAlias {
        self.tag_alias
    }
}

/// The declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Primitive(PrimitiveType),
    /// A registry type, by canonical qualified name.
    Type(String),
    /// An extension slot holding opaque markup.
    Any,
}

impl PropertyType {
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&str> {
        match self {
            Self::Type(name) => Some(name),
            _ => None,
        }
    }
}

/// A fully resolved property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    name: String,
    namespace: String,
    declared_by: String,
    ty: PropertyType,
    many: bool,
    kind: SerializationKind,
    style: ElementStyle,
    reference_encoding: ReferenceEncoding,
    is_id: bool,
    default: Option<Scalar>,
    extension: bool,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URI of the namespace whose descriptor declared the property.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Canonical name of the type the property belongs to.
    pub fn declared_by(&self) -> &str {
        &self.declared_by
    }

    pub fn ty(&self) -> &PropertyType {
        &self.ty
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn kind(&self) -> SerializationKind {
        self.kind
    }

    pub fn style(&self) -> ElementStyle {
        self.style
    }

    pub fn reference_encoding(&self) -> ReferenceEncoding {
        self.reference_encoding
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn default(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    /// Returns `true` if another namespace added the property via `extends`.
    pub fn is_extension(&self) -> bool {
        self.extension
    }

    /// Returns `true` if the property is written as an attribute.
    pub fn is_attribute(&self) -> bool {
        match self.kind {
            SerializationKind::Attribute => true,
            SerializationKind::Reference => {
                self.reference_encoding != ReferenceEncoding::Element
            }
            SerializationKind::Element | SerializationKind::Body => false,
        }
    }

    /// Returns `true` if the property is written as child elements.
    pub fn is_element(&self) -> bool {
        match self.kind {
            SerializationKind::Element => true,
            SerializationKind::Reference => {
                self.reference_encoding == ReferenceEncoding::Element
            }
            SerializationKind::Attribute | SerializationKind::Body => false,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.kind == SerializationKind::Reference
    }

    pub fn is_body(&self) -> bool {
        self.kind == SerializationKind::Body
    }

    /// Returns `true` for extension slots of type `any`.
    pub fn is_any(&self) -> bool {
        self.ty == PropertyType::Any
    }
}

/// A type known to the registry.
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    namespace: String,
    local_name: String,
    tag: String,
    super_type: Option<String>,
    is_abstract: bool,
    properties: Vec<PropertyDescriptor>,
    effective: OnceLock<Vec<PropertyDescriptor>>,
}

impl TypeDescriptor {
    /// Canonical qualified name, e.g. `dmn:Decision`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URI of the type's namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Local element name after the package's tag alias is applied.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Canonical name of the supertype.
    pub fn super_type(&self) -> Option<&str> {
        self.super_type.as_deref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Properties declared on this type, including those added via `extends`.
    pub fn own_properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    fn same_shape(&self, other: &TypeDescriptor) -> bool {
        self.super_type == other.super_type
            && self.is_abstract == other.is_abstract
            && self.properties == other.properties
    }
}

/// Queryable meta-model built from descriptors.
///
/// The registry is immutable after construction and can be shared across
/// threads; inheritance flattening is computed on first query and cached.
#[derive(Debug)]
pub struct Registry {
    namespaces: IndexMap<String, Namespace>,
    prefixes: HashMap<String, String>,
    types: IndexMap<String, TypeDescriptor>,
    by_local: HashMap<(String, String), String>,
    by_tag: HashMap<(String, String), String>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Resolve a qualified name (`prefix:Name`) to its type.
    ///
    /// Any prefix a descriptor declared for the namespace is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if the prefix or the type is not
    /// registered.
    pub fn resolve_type(&self, qualified_name: &str) -> Result<&TypeDescriptor, SchemaError> {
        let unknown = || SchemaError::UnknownType(qualified_name.to_string());
        let name = QName::parse(qualified_name);
        let uri = name
            .prefix()
            .and_then(|prefix| self.prefixes.get(prefix))
            .ok_or_else(unknown)?;
        self.type_by_local(uri, name.local()).ok_or_else(unknown)
    }

    /// Look up a type by namespace URI and local type name.
    pub fn type_by_local(&self, uri: &str, local: &str) -> Option<&TypeDescriptor> {
        self.by_local
            .get(&(uri.to_string(), local.to_string()))
            .and_then(|name| self.types.get(name))
    }

    /// Look up the type whose element name is `tag` in namespace `uri`.
    pub fn type_for_tag(&self, uri: &str, tag: &str) -> Option<&TypeDescriptor> {
        self.by_tag
            .get(&(uri.to_string(), tag.to_string()))
            .and_then(|name| self.types.get(name))
    }

    /// Iterate over all types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// The namespace registered for `uri`.
    pub fn namespace(&self, uri: &str) -> Option<&Namespace> {
        self.namespaces.get(uri)
    }

    /// Iterate over namespaces in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// The namespace URI a descriptor prefix refers to.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&Namespace> {
        self.prefixes
            .get(prefix)
            .and_then(|uri| self.namespaces.get(uri))
    }

    /// The property set of `ty` with inheritance applied.
    ///
    /// Supertype properties come first; a subtype property with the same name
    /// replaces the supertype's in place.
    pub fn effective_properties<'r>(&'r self, ty: &'r TypeDescriptor) -> &'r [PropertyDescriptor] {
        ty.effective.get_or_init(|| {
            trace!(type_name = ty.name(); "Flattening inherited properties");
            let mut properties = ty
                .super_type()
                .and_then(|name| self.types.get(name))
                .map(|super_type| self.effective_properties(super_type).to_vec())
                .unwrap_or_default();
            for own in &ty.properties {
                match properties.iter_mut().find(|p| p.name == own.name) {
                    Some(slot) => *slot = own.clone(),
                    None => properties.push(own.clone()),
                }
            }
            properties
        })
    }

    /// Find a property of `ty` by name, inheritance applied.
    pub fn property<'r>(
        &'r self,
        ty: &'r TypeDescriptor,
        name: &str,
    ) -> Option<&'r PropertyDescriptor> {
        self.effective_properties(ty)
            .iter()
            .find(|property| property.name == name)
    }

    /// Returns `true` if `sub` is `sup` or one of its subtypes.
    ///
    /// Both names are canonical qualified names.
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        let mut current = self.types.get(sub);
        while let Some(ty) = current {
            if ty.name == sup {
                return true;
            }
            current = ty.super_type().and_then(|name| self.types.get(name));
        }
        false
    }

    /// The property holding identity for instances of `ty`.
    ///
    /// This is the property flagged `isId`, or else a single `String` property
    /// named `id`.
    pub fn identity_property<'r>(&'r self, ty: &'r TypeDescriptor) -> Option<&'r PropertyDescriptor> {
        let properties = self.effective_properties(ty);
        properties.iter().find(|property| property.is_id).or_else(|| {
            properties.iter().find(|property| {
                property.name == "id"
                    && !property.many
                    && property.ty == PropertyType::Primitive(PrimitiveType::String)
            })
        })
    }

    /// The identity of an instance, if its type has an identity property and
    /// it is set.
    pub fn identity_of(&self, instance: &Instance) -> Option<String> {
        let ty = self.types.get(instance.type_name())?;
        let property = self.identity_property(ty)?;
        instance
            .get(property.name())
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// The declared default of a property, if any.
    pub fn default_value(&self, type_name: &str, property: &str) -> Option<&Scalar> {
        let ty = self.types.get(type_name)?;
        self.property(ty, property)?.default()
    }

    /// Create an empty instance of a concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] for unknown names and
    /// [`SchemaError::AbstractType`] for abstract types.
    pub fn create(&self, type_name: &str) -> Result<ObjectRef, SchemaError> {
        let ty = self.resolve_type(type_name)?;
        if ty.is_abstract {
            return Err(SchemaError::AbstractType(ty.name.clone()));
        }
        Ok(ObjectRef::new(Instance::new(ty.name.clone())))
    }

    /// Render an instance graph as JSON for inspection and comparison.
    ///
    /// Objects become `{"$type": ..., <properties>}`, resolved references
    /// `{"$ref": <target id>}`, unresolved ones `{"$unresolved": <id>}`.
    pub fn snapshot(&self, object: &ObjectRef) -> serde_json::Value {
        crate::snapshot::snapshot(self, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PackageDescriptor;

    fn registry() -> Registry {
        let base = PackageDescriptor::from_json(
            r#"{
                "name": "Base", "uri": "urn:base", "prefix": "b",
                "xml": { "tagAlias": "lowerCase" },
                "types": [
                    { "name": "Element", "isAbstract": true, "properties": [
                        { "name": "id", "type": "String", "isId": true },
                        { "name": "label", "type": "String" }
                    ] },
                    { "name": "Named", "superClass": "Element", "isAbstract": true, "properties": [
                        { "name": "name", "type": "String" },
                        { "name": "label", "type": "String", "kind": "body" }
                    ] },
                    { "name": "Node", "superClass": "Named", "properties": [
                        { "name": "weight", "type": "Real", "default": 1 },
                        { "name": "next", "type": "Node", "kind": "reference" }
                    ] },
                    { "name": "Plain", "properties": [ { "name": "id", "type": "String" } ] }
                ]
            }"#,
        )
        .unwrap();
        Registry::builder().register(base).build().unwrap()
    }

    #[test]
    fn test_resolve_type_and_tag() {
        let registry = registry();
        let node = registry.resolve_type("b:Node").unwrap();

        assert_eq!(node.name(), "b:Node");
        assert_eq!(node.tag(), "node");
        assert!(registry.type_for_tag("urn:base", "node").is_some());
        assert!(registry.type_for_tag("urn:base", "Node").is_none());
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = registry();

        assert!(matches!(
            registry.resolve_type("b:Missing"),
            Err(SchemaError::UnknownType(name)) if name == "b:Missing"
        ));
        assert!(registry.resolve_type("Node").is_err());
        assert!(registry.resolve_type("x:Node").is_err());
    }

    #[test]
    fn test_effective_properties_override_in_place() {
        let registry = registry();
        let node = registry.resolve_type("b:Node").unwrap();
        let properties = registry.effective_properties(node);

        let names: Vec<&str> = properties.iter().map(PropertyDescriptor::name).collect();
        assert_eq!(names, vec!["id", "label", "name", "weight", "next"]);
        assert!(properties[1].is_body());
        assert_eq!(properties[1].declared_by(), "b:Named");
    }

    #[test]
    fn test_effective_properties_cached() {
        let registry = registry();
        let node = registry.resolve_type("b:Node").unwrap();

        let first = registry.effective_properties(node).as_ptr();
        let second = registry.effective_properties(node).as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_assignable() {
        let registry = registry();

        assert!(registry.is_assignable("b:Node", "b:Element"));
        assert!(registry.is_assignable("b:Node", "b:Node"));
        assert!(!registry.is_assignable("b:Element", "b:Node"));
        assert!(!registry.is_assignable("b:Plain", "b:Element"));
    }

    #[test]
    fn test_identity_property_flag_and_fallback() {
        let registry = registry();
        let node = registry.resolve_type("b:Node").unwrap();
        let plain = registry.resolve_type("b:Plain").unwrap();

        assert!(registry.identity_property(node).unwrap().is_id());
        assert_eq!(registry.identity_property(plain).unwrap().name(), "id");
    }

    #[test]
    fn test_identity_of_instance() {
        let registry = registry();
        let node = registry.create("b:Node").unwrap();
        assert_eq!(registry.identity_of(&node.borrow()), None);

        node.set("id", "Node_1");
        assert_eq!(registry.identity_of(&node.borrow()).as_deref(), Some("Node_1"));
    }

    #[test]
    fn test_default_value() {
        let registry = registry();

        assert_eq!(
            registry.default_value("b:Node", "weight"),
            Some(&Scalar::Real(1.0))
        );
        assert_eq!(registry.default_value("b:Node", "name"), None);
    }

    #[test]
    fn test_create_rejects_abstract() {
        let registry = registry();

        assert!(matches!(
            registry.create("b:Element"),
            Err(SchemaError::AbstractType(_))
        ));
        assert_eq!(registry.create("b:Node").unwrap().type_name(), "b:Node");
    }

    #[test]
    fn test_registry_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Registry>();
    }
}

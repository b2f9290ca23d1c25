//! Registry construction.
//!
//! Building runs in fixed phases so that every check sees a complete picture:
//!
//! 1. **Namespaces** - bind URIs to canonical prefixes
//! 2. **Types** - resolve names and merge identical re-declarations
//! 3. **Extends** - merge properties layered on from other namespaces
//! 4. **Validate** - supertypes, property types, cycles, per-type invariants
//! 5. **Index** - element tag lookup tables

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info};

use super::{Namespace, PropertyDescriptor, PropertyType, Registry, TypeDescriptor};
use crate::{
    descriptor::{
        ElementStyle, PackageDescriptor, PropertyDefinition, SerializationKind, TagAlias,
        TypeDefinition,
    },
    error::SchemaError,
    qname::{QName, qualify},
    value::{PrimitiveType, Scalar},
};

/// Collects descriptors and merges them into a [`Registry`].
///
/// # Example
///
/// ```
/// use tessera_core::RegistryBuilder;
///
/// let registry = RegistryBuilder::new()
///     .register_json(r#"{ "name": "A", "uri": "urn:a", "prefix": "a",
///                         "types": [ { "name": "Item" } ] }"#)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert!(registry.resolve_type("a:Item").is_ok());
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    packages: Vec<PackageDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. Order matters for prefix assignment.
    pub fn register(mut self, package: PackageDescriptor) -> Self {
        self.packages.push(package);
        self
    }

    /// Add a descriptor given as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] if the text is not a valid descriptor.
    pub fn register_json(self, json: &str) -> Result<Self, SchemaError> {
        Ok(self.register(PackageDescriptor::from_json(json)?))
    }

    /// Merge all registered descriptors into an immutable registry.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Conflict`] when descriptors disagree,
    /// [`SchemaError::UnknownType`] for dangling type names and
    /// [`SchemaError::InvalidDescriptor`] for structurally unusable
    /// definitions.
    pub fn build(self) -> Result<Registry, SchemaError> {
        info!(packages = self.packages.len(); "Building type registry");

        let (namespaces, prefixes) = bind_namespaces(&self.packages)?;
        let names = NameResolver {
            namespaces: &namespaces,
            prefixes: &prefixes,
        };

        let mut types: IndexMap<String, TypeDescriptor> = IndexMap::new();
        for package in &self.packages {
            for definition in &package.types {
                let ty = names.type_descriptor(package, definition)?;
                match types.get(&ty.name) {
                    Some(existing) if existing.same_shape(&ty) => {
                        debug!(type_name = ty.name; "Merging identical type declaration");
                    }
                    Some(_) => {
                        return Err(SchemaError::Conflict(format!(
                            "type `{}` is declared twice with different shapes",
                            ty.name
                        )));
                    }
                    None => {
                        types.insert(ty.name.clone(), ty);
                    }
                }
            }
        }

        for package in &self.packages {
            for extension in &package.extends {
                let target = names.qualify_type(&extension.target, package)?;
                let ty = types
                    .get_mut(&target)
                    .ok_or_else(|| SchemaError::UnknownType(extension.target.clone()))?;
                for definition in &extension.properties {
                    if ty.properties.iter().any(|p| p.name == definition.name) {
                        return Err(SchemaError::Conflict(format!(
                            "`{}` extends `{target}` with property `{}`, which it already has",
                            package.name, definition.name
                        )));
                    }
                    let mut property = names.property_descriptor(package, &target, definition)?;
                    property.extension = true;
                    ty.properties.push(property);
                }
                debug!(package = package.name, extended = target; "Merged extension properties");
            }
        }

        validate(&types)?;
        let (by_local, by_tag) = index(&types)?;

        info!(namespaces = namespaces.len(), types = types.len(); "Type registry built");

        Ok(Registry {
            namespaces,
            prefixes,
            types,
            by_local,
            by_tag,
        })
    }
}

type NamespaceTables = (IndexMap<String, Namespace>, HashMap<String, String>);

/// Assign canonical prefixes, first registration wins unless a later
/// descriptor explicitly requests its prefix.
fn bind_namespaces(packages: &[PackageDescriptor]) -> Result<NamespaceTables, SchemaError> {
    let mut namespaces: IndexMap<String, Namespace> = IndexMap::new();
    let mut prefixes: HashMap<String, String> = HashMap::new();
    let mut requested: HashSet<String> = HashSet::new();

    for package in packages {
        match prefixes.get(&package.prefix) {
            Some(uri) if uri != &package.uri => {
                return Err(SchemaError::Conflict(format!(
                    "prefix `{}` is bound to both `{uri}` and `{}`",
                    package.prefix, package.uri
                )));
            }
            Some(_) => {}
            None => {
                prefixes.insert(package.prefix.clone(), package.uri.clone());
            }
        }

        let tag_alias = package.xml.as_ref().and_then(|xml| xml.tag_alias);
        match namespaces.get_mut(&package.uri) {
            None => {
                namespaces.insert(
                    package.uri.clone(),
                    Namespace {
                        uri: package.uri.clone(),
                        prefix: package.prefix.clone(),
                        tag_alias: tag_alias.unwrap_or_default(),
                    },
                );
                if package.canonical_prefix {
                    requested.insert(package.uri.clone());
                }
            }
            Some(namespace) => {
                if package.canonical_prefix && namespace.prefix != package.prefix {
                    if requested.contains(&package.uri) {
                        return Err(SchemaError::Conflict(format!(
                            "namespace `{}` requests both `{}` and `{}` as its prefix",
                            package.uri, namespace.prefix, package.prefix
                        )));
                    }
                    debug!(uri = package.uri, prefix = package.prefix; "Canonical prefix requested");
                    namespace.prefix = package.prefix.clone();
                }
                if package.canonical_prefix {
                    requested.insert(package.uri.clone());
                }
                if let Some(alias) = tag_alias {
                    if alias != namespace.tag_alias && namespace.tag_alias != TagAlias::None {
                        return Err(SchemaError::Conflict(format!(
                            "namespace `{}` declares conflicting tag aliases",
                            package.uri
                        )));
                    }
                    namespace.tag_alias = alias;
                }
            }
        }
    }

    Ok((namespaces, prefixes))
}

/// Turns descriptor spellings into canonical names.
struct NameResolver<'a> {
    namespaces: &'a IndexMap<String, Namespace>,
    prefixes: &'a HashMap<String, String>,
}

impl NameResolver<'_> {
    fn namespace<'n>(&'n self, uri: &str) -> &'n Namespace {
        // Every package URI is bound by `bind_namespaces`.
        &self.namespaces[uri]
    }

    /// Canonical `prefix:Local` for a type name written inside `package`.
    fn qualify_type(&self, name: &str, package: &PackageDescriptor) -> Result<String, SchemaError> {
        let (uri, local) = self.split(name, package)?;
        Ok(qualify(self.namespace(uri).prefix(), local))
    }

    fn split<'n>(
        &'n self,
        name: &'n str,
        package: &'n PackageDescriptor,
    ) -> Result<(&'n str, &'n str), SchemaError> {
        let qname = QName::parse(name);
        match qname.prefix() {
            Some(prefix) => self
                .prefixes
                .get(prefix)
                .map(|uri| (uri.as_str(), qname.local()))
                .ok_or_else(|| SchemaError::UnknownType(name.to_string())),
            None => Ok((package.uri.as_str(), qname.local())),
        }
    }

    fn type_descriptor(
        &self,
        package: &PackageDescriptor,
        definition: &TypeDefinition,
    ) -> Result<TypeDescriptor, SchemaError> {
        let namespace = self.namespace(&package.uri);
        let name = qualify(namespace.prefix(), &definition.name);
        let super_type = definition
            .super_class
            .as_deref()
            .map(|super_class| self.qualify_type(super_class, package))
            .transpose()?;

        let mut properties: Vec<PropertyDescriptor> = Vec::new();
        for property in &definition.properties {
            if properties.iter().any(|p| p.name == property.name) {
                return Err(SchemaError::Conflict(format!(
                    "type `{name}` declares property `{}` twice",
                    property.name
                )));
            }
            properties.push(self.property_descriptor(package, &name, property)?);
        }

        Ok(TypeDescriptor {
            tag: namespace.tag_alias().apply(&definition.name),
            local_name: definition.name.clone(),
            namespace: package.uri.clone(),
            name,
            super_type,
            is_abstract: definition.is_abstract,
            properties,
            effective: Default::default(),
        })
    }

    fn property_descriptor(
        &self,
        package: &PackageDescriptor,
        owner: &str,
        definition: &PropertyDefinition,
    ) -> Result<PropertyDescriptor, SchemaError> {
        let invalid =
            |reason: &str| SchemaError::InvalidDescriptor(format!("`{owner}.{}` {reason}", definition.name));

        let ty = match definition.type_name.as_str() {
            "any" => PropertyType::Any,
            name => match PrimitiveType::from_name(name) {
                Some(primitive) => PropertyType::Primitive(primitive),
                None => PropertyType::Type(self.qualify_type(name, package)?),
            },
        };

        let kind = definition.kind.unwrap_or(match ty {
            PropertyType::Primitive(_) => SerializationKind::Attribute,
            PropertyType::Type(_) | PropertyType::Any => SerializationKind::Element,
        });

        match (kind, &ty) {
            (SerializationKind::Attribute | SerializationKind::Body, PropertyType::Primitive(_)) => {}
            (SerializationKind::Attribute | SerializationKind::Body, _) => {
                return Err(invalid("must have a primitive type"));
            }
            (SerializationKind::Reference, PropertyType::Type(_)) => {}
            (SerializationKind::Reference, _) => {
                return Err(invalid("must reference a registry type"));
            }
            (SerializationKind::Element, _) => {}
        }
        if kind == SerializationKind::Body && definition.is_many {
            return Err(invalid("cannot be a many-valued body"));
        }
        if kind == SerializationKind::Element
            && definition.style != ElementStyle::Property
            && ty.as_type().is_none()
        {
            return Err(invalid("uses a type-named element style without an object type"));
        }
        if definition.is_id
            && (kind != SerializationKind::Attribute
                || definition.is_many
                || ty != PropertyType::Primitive(PrimitiveType::String))
        {
            return Err(invalid("must be a single String attribute to carry identity"));
        }

        let default = match (&definition.default, ty.as_primitive()) {
            (None, _) => None,
            (Some(value), Some(primitive)) => {
                Some(Scalar::from_json(primitive, value).map_err(|reason| invalid(&reason))?)
            }
            (Some(_), None) => return Err(invalid("declares a default but is not primitive")),
        };

        Ok(PropertyDescriptor {
            name: definition.name.clone(),
            namespace: package.uri.clone(),
            declared_by: owner.to_string(),
            ty,
            many: definition.is_many,
            kind,
            style: definition.style,
            reference_encoding: definition.reference_encoding,
            is_id: definition.is_id,
            default,
            extension: false,
        })
    }
}

fn validate(types: &IndexMap<String, TypeDescriptor>) -> Result<(), SchemaError> {
    for ty in types.values() {
        if let Some(super_type) = ty.super_type() {
            if !types.contains_key(super_type) {
                return Err(SchemaError::UnknownType(super_type.to_string()));
            }
        }
        for property in &ty.properties {
            if let PropertyType::Type(target) = &property.ty {
                if !types.contains_key(target) {
                    return Err(SchemaError::UnknownType(target.clone()));
                }
            }
        }
    }

    for ty in types.values() {
        let chain = supertype_chain(types, ty)?;

        // Walk root to leaf, applying overrides the way flattening does.
        let mut effective: Vec<&PropertyDescriptor> = Vec::new();
        for link in chain.iter().rev() {
            for property in &link.properties {
                match effective.iter_mut().find(|p| p.name == property.name) {
                    Some(slot) if property.extension => {
                        return Err(SchemaError::Conflict(format!(
                            "extension property `{}` on `{}` shadows `{}.{}`",
                            property.name, ty.name, slot.declared_by, slot.name
                        )));
                    }
                    Some(slot) => *slot = property,
                    None => effective.push(property),
                }
            }
        }

        if effective.iter().filter(|p| p.is_body()).count() > 1 {
            return Err(SchemaError::InvalidDescriptor(format!(
                "type `{}` has more than one body property",
                ty.name
            )));
        }
        if effective.iter().filter(|p| p.is_id).count() > 1 {
            return Err(SchemaError::InvalidDescriptor(format!(
                "type `{}` has more than one id property",
                ty.name
            )));
        }
    }

    Ok(())
}

/// The chain from `ty` up to its root supertype, leaf first.
fn supertype_chain<'t>(
    types: &'t IndexMap<String, TypeDescriptor>,
    ty: &'t TypeDescriptor,
) -> Result<Vec<&'t TypeDescriptor>, SchemaError> {
    let mut chain = vec![ty];
    let mut seen: HashSet<&str> = HashSet::from([ty.name()]);
    let mut current = ty;
    while let Some(super_type) = current.super_type().and_then(|name| types.get(name)) {
        if !seen.insert(super_type.name()) {
            return Err(SchemaError::InvalidDescriptor(format!(
                "supertype cycle through `{}`",
                super_type.name
            )));
        }
        chain.push(super_type);
        current = super_type;
    }
    Ok(chain)
}

type TagTables = (
    HashMap<(String, String), String>,
    HashMap<(String, String), String>,
);

fn index(types: &IndexMap<String, TypeDescriptor>) -> Result<TagTables, SchemaError> {
    let mut by_local = HashMap::new();
    let mut by_tag = HashMap::new();
    for ty in types.values() {
        by_local.insert(
            (ty.namespace.clone(), ty.local_name.clone()),
            ty.name.clone(),
        );
        if let Some(previous) = by_tag.insert((ty.namespace.clone(), ty.tag.clone()), ty.name.clone()) {
            return Err(SchemaError::Conflict(format!(
                "types `{previous}` and `{}` share the element name `{}`",
                ty.name, ty.tag
            )));
        }
    }
    Ok((by_local, by_tag))
}

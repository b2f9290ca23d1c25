//! Instance graph to markup.
//!
//! Writing happens in two passes. The first walks the containment tree with
//! shared borrows only, checking every value against the registry and
//! collecting the namespaces in use and the reference targets that still need
//! an id. Ids are then synthesized, which is the only mutation a write makes.
//! The second pass emits the document.

use std::collections::HashSet;

use indexmap::IndexSet;
use log::{debug, info, trace};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use tessera_core::{
    ObjectRef, Reference, Registry, Value,
    descriptor::{ElementStyle, ReferenceEncoding},
    extension::NamespaceBinding,
    instance::Instance,
    qname::qualify,
    registry::{PropertyDescriptor, PropertyType, TypeDescriptor, XSI_NAMESPACE},
};

use crate::{
    error::{Diagnostic, ErrorCode, MappingError, Result},
    namespace::NamespaceScope,
    options::WriteOptions,
};

/// Writes instance graphs typed by a [`Registry`] as markup.
///
/// # Example
///
/// ```
/// use tessera_core::Registry;
/// use tessera_xml::{WriteOptions, Writer};
///
/// let registry = Registry::builder()
///     .register_json(r#"{ "name": "Notes", "uri": "urn:notes", "prefix": "n",
///         "types": [ { "name": "Note", "properties": [
///             { "name": "id", "type": "String" },
///             { "name": "text", "type": "String", "kind": "body" } ] } ] }"#)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let note = registry.create("n:Note").unwrap();
/// note.set("id", "n1");
/// note.set("text", "a < b");
///
/// let writer = Writer::new(&registry, WriteOptions::default().with_xml_declaration(false));
/// assert_eq!(
///     writer.write(&note).unwrap(),
///     r#"<n:Note xmlns:n="urn:notes" id="n1">a &lt; b</n:Note>"#
/// );
/// ```
pub struct Writer<'r> {
    registry: &'r Registry,
    options: WriteOptions,
}

impl<'r> Writer<'r> {
    pub fn new(registry: &'r Registry, options: WriteOptions) -> Self {
        Self { registry, options }
    }

    /// Write the graph rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] of kind `Validation` if an instance does not
    /// fit the registry, a reference target was dropped, or a target has no
    /// id and synthesis is disabled. Nothing is written in that case.
    pub fn write(&self, root: &ObjectRef) -> std::result::Result<String, MappingError> {
        info!(
            root = root.type_name(),
            synthesize_ids = self.options.synthesize_ids();
            "Writing document"
        );

        let mut plan = Plan::default();
        self.collect(root, &mut plan)?;
        debug!(
            namespaces = plan.namespaces.len(),
            targets_without_id = plan.targets.len();
            "Graph checked"
        );
        self.assign_ids(&mut plan)?;

        let markup = Emitter::new(self.registry).document(root, &plan, self.options)?;
        info!(bytes = markup.len(); "Document written");
        Ok(markup)
    }

    fn collect(&self, object: &ObjectRef, plan: &mut Plan) -> Result<()> {
        let registry = self.registry;
        let instance = object.borrow();
        let ty = known_type(registry, &instance)?;
        plan.namespaces.insert(ty.namespace().to_string());
        if let Some(id) = registry.identity_of(&instance) {
            plan.ids.insert(id);
        }

        for (name, value) in instance.properties() {
            let property = registry.property(ty, name).ok_or_else(|| {
                mismatch(format!("type `{}` has no property `{name}`", ty.name()))
            })?;
            // Type-style children are named after their own type.
            let named_element = property.is_element() && property.style() != ElementStyle::Type;
            if named_element || is_foreign_attribute(ty, property) {
                plan.namespaces.insert(property.namespace().to_string());
            }
            if !property.is_many() && matches!(value, Value::List(_)) {
                return Err(mismatch(format!(
                    "property `{name}` of `{}` holds a list but is single-valued",
                    ty.name()
                )));
            }

            for item in value.items() {
                match (property.ty(), item) {
                    (PropertyType::Type(_), Value::Reference(reference)) if property.is_reference() => {
                        self.collect_target(reference, property, plan)?;
                    }
                    (PropertyType::Type(declared), Value::Object(child)) if !property.is_reference() => {
                        let child_type = child.type_name();
                        if !registry.is_assignable(&child_type, declared) {
                            return Err(mismatch(format!(
                                "property `{name}` expects `{declared}` but holds `{child_type}`"
                            )));
                        }
                        if property.style() == ElementStyle::Property && child_type != *declared {
                            plan.uses_xsi = true;
                        }
                        self.collect(child, plan)?;
                    }
                    (PropertyType::Primitive(_), Value::Scalar(_)) => {}
                    (PropertyType::Any, Value::Extension(_)) => {}
                    _ => {
                        return Err(mismatch(format!(
                            "property `{name}` of `{}` holds a value of the wrong kind",
                            ty.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_target(
        &self,
        reference: &Reference,
        property: &PropertyDescriptor,
        plan: &mut Plan,
    ) -> Result<()> {
        let Reference::Resolved(_) = reference else {
            return Ok(());
        };
        let target = reference.target().ok_or_else(|| {
            Diagnostic::error(format!(
                "reference `{}` points to an instance that no longer exists",
                property.name()
            ))
            .with_code(ErrorCode::E302)
        })?;

        let has_id = self.registry.identity_of(&target.borrow()).is_some();
        if !has_id && !plan.targets.iter().any(|known| known.ptr_eq(&target)) {
            plan.targets.push(target);
        }
        Ok(())
    }

    /// Give every referenced instance without an id a fresh one.
    fn assign_ids(&self, plan: &mut Plan) -> Result<()> {
        let registry = self.registry;
        let mut slots = Vec::with_capacity(plan.targets.len());
        for target in &plan.targets {
            let type_name = target.type_name();
            if !self.options.synthesize_ids() {
                return Err(Diagnostic::error(format!(
                    "a referenced `{type_name}` has no id"
                ))
                .with_code(ErrorCode::E301)
                .with_help("set an id on the target or enable id synthesis"));
            }
            let ty = registry.resolve_type(&type_name).map_err(|err| {
                Diagnostic::error(err.to_string()).with_code(ErrorCode::E300)
            })?;
            let property = registry.identity_property(ty).ok_or_else(|| {
                Diagnostic::error(format!("type `{type_name}` has no identity property"))
                    .with_code(ErrorCode::E301)
            })?;
            slots.push((target, ty.local_name(), property.name()));
        }

        for (target, local, property) in slots {
            let id = (1..)
                .map(|n| format!("{local}_{n}"))
                .find(|candidate| !plan.ids.contains(candidate))
                .unwrap_or_default();
            debug!(id, type_name = local; "Synthesized id");
            plan.ids.insert(id.clone());
            target.set(property, id);
        }
        Ok(())
    }
}

/// What the check pass learned about a graph.
#[derive(Debug, Default)]
struct Plan {
    namespaces: IndexSet<String>,
    uses_xsi: bool,
    ids: HashSet<String>,
    targets: Vec<ObjectRef>,
}

/// The emission pass.
struct Emitter<'r> {
    registry: &'r Registry,
    writer: quick_xml::Writer<Vec<u8>>,
    scope: NamespaceScope,
}

impl<'r> Emitter<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            writer: quick_xml::Writer::new(Vec::new()),
            scope: NamespaceScope::new(),
        }
    }

    fn document(mut self, root: &ObjectRef, plan: &Plan, options: WriteOptions) -> Result<String> {
        if options.xml_declaration() {
            self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            self.writer.get_mut().push(b'\n');
        }

        let mut declarations = Vec::with_capacity(plan.namespaces.len() + 1);
        for uri in &plan.namespaces {
            declarations.push(NamespaceBinding::new(Some(self.prefix(uri)?.to_string()), uri));
        }
        if plan.uses_xsi {
            declarations.push(NamespaceBinding::new(Some("xsi".to_string()), XSI_NAMESPACE));
        }

        let name = {
            let instance = root.borrow();
            let ty = known_type(self.registry, &instance)?;
            self.type_element(ty)?
        };
        self.object(root, &name, None, declarations)?;

        String::from_utf8(self.writer.into_inner()).map_err(|err| {
            Diagnostic::error(format!("output is not UTF-8: {err}")).with_code(ErrorCode::E304)
        })
    }

    fn object(
        &mut self,
        object: &ObjectRef,
        name: &str,
        xsi_type: Option<String>,
        mut declarations: Vec<NamespaceBinding>,
    ) -> Result<()> {
        let registry = self.registry;
        let instance = object.borrow();
        let ty = known_type(registry, &instance)?;
        trace!(type_name = ty.name(), element = name; "Writing element");

        for binding in extension_bindings(&instance) {
            self.require(binding, &mut declarations)?;
        }

        let mut start = BytesStart::new(name);
        for binding in &declarations {
            start.push_attribute((binding.attribute_name().as_str(), binding.uri()));
        }
        if let Some(xsi_type) = &xsi_type {
            start.push_attribute(("xsi:type", xsi_type.as_str()));
        }
        self.scope.push(declarations);

        let properties = registry.effective_properties(ty);
        for property in properties.iter().filter(|property| property.is_attribute()) {
            let Some(value) = instance.get(property.name()) else {
                continue;
            };
            let key = self.attribute_name(ty, property)?;
            let text = self.attribute_text(property, value)?;
            start.push_attribute((key.as_str(), text.as_str()));
        }
        for attribute in instance.extension_attributes() {
            start.push_attribute((attribute.name(), attribute.value()));
        }

        let body = properties
            .iter()
            .find(|property| property.is_body())
            .and_then(|property| instance.get(property.name()));
        let has_children = properties
            .iter()
            .any(|property| property.is_element() && instance.is_set(property.name()));
        if body.is_none() && !has_children && instance.extension_elements().is_empty() {
            self.emit(Event::Empty(start))?;
            self.scope.pop();
            return Ok(());
        }

        self.emit(Event::Start(start))?;
        if let Some(Value::Scalar(text)) = body {
            self.emit(Event::Text(BytesText::new(&text.to_string())))?;
        }
        for property in properties.iter().filter(|property| property.is_element()) {
            if let Some(value) = instance.get(property.name()) {
                self.element_property(property, value)?;
            }
        }
        for extension in instance.extension_elements() {
            self.writer.get_mut().extend_from_slice(extension.markup().as_bytes());
        }
        self.emit(Event::End(BytesEnd::new(name)))?;
        self.scope.pop();
        Ok(())
    }

    fn element_property(&mut self, property: &PropertyDescriptor, value: &Value) -> Result<()> {
        let name = self.property_name(property)?;
        match property.ty() {
            PropertyType::Type(_) if property.is_reference() => {
                for item in value.items() {
                    let Value::Reference(reference) = item else {
                        return Err(wrong_kind(property));
                    };
                    let href = format!("#{}", self.reference_id(property, reference)?);
                    let mut start = BytesStart::new(name.as_str());
                    start.push_attribute(("href", href.as_str()));
                    self.emit(Event::Empty(start))?;
                }
            }
            PropertyType::Any => {
                for item in value.items() {
                    let Value::Extension(extension) = item else {
                        return Err(wrong_kind(property));
                    };
                    self.writer.get_mut().extend_from_slice(extension.markup().as_bytes());
                }
            }
            PropertyType::Primitive(_) => {
                for item in value.items() {
                    let Value::Scalar(scalar) = item else {
                        return Err(wrong_kind(property));
                    };
                    self.emit(Event::Start(BytesStart::new(name.as_str())))?;
                    self.emit(Event::Text(BytesText::new(&scalar.to_string())))?;
                    self.emit(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            PropertyType::Type(declared) => match property.style() {
                ElementStyle::Property => {
                    for child in objects(property, value)? {
                        let child_type = child.type_name();
                        let xsi_type = if child_type == *declared {
                            None
                        } else {
                            let ty = self.resolve(&child_type)?;
                            Some(qualify(self.prefix(ty.namespace())?, ty.local_name()))
                        };
                        self.object(child, &name, xsi_type, Vec::new())?;
                    }
                }
                ElementStyle::Type => {
                    for child in objects(property, value)? {
                        let element = self.type_element(self.resolve(&child.type_name())?)?;
                        self.object(child, &element, None, Vec::new())?;
                    }
                }
                ElementStyle::Wrapped => {
                    let children = objects(property, value)?;
                    if children.is_empty() {
                        return Ok(());
                    }
                    self.emit(Event::Start(BytesStart::new(name.as_str())))?;
                    for child in children {
                        let element = self.type_element(self.resolve(&child.type_name())?)?;
                        self.object(child, &element, None, Vec::new())?;
                    }
                    self.emit(Event::End(BytesEnd::new(name.as_str())))?;
                }
            },
        }
        Ok(())
    }

    /// Lexical form of an attribute-encoded value; lists are space-joined.
    fn attribute_text(&self, property: &PropertyDescriptor, value: &Value) -> Result<String> {
        let mut parts = Vec::new();
        for item in value.items() {
            let part = match item {
                Value::Scalar(scalar) if !property.is_reference() => scalar.to_string(),
                Value::Reference(reference) if property.is_reference() => {
                    let id = self.reference_id(property, reference)?;
                    match property.reference_encoding() {
                        ReferenceEncoding::Bare => id,
                        ReferenceEncoding::Fragment | ReferenceEncoding::Element => format!("#{id}"),
                    }
                }
                _ => return Err(wrong_kind(property)),
            };
            parts.push(part);
        }
        Ok(parts.join(" "))
    }

    fn reference_id(&self, property: &PropertyDescriptor, reference: &Reference) -> Result<String> {
        if let Some(id) = reference.unresolved_id() {
            return Ok(id.to_string());
        }
        let target = reference.target().ok_or_else(|| {
            Diagnostic::error(format!(
                "reference `{}` points to an instance that no longer exists",
                property.name()
            ))
            .with_code(ErrorCode::E302)
        })?;
        self.registry.identity_of(&target.borrow()).ok_or_else(|| {
            Diagnostic::error(format!("a referenced `{}` has no id", target.type_name()))
                .with_code(ErrorCode::E301)
        })
    }

    /// Make sure `binding` is in scope for the element being opened.
    fn require(&self, binding: &NamespaceBinding, declarations: &mut Vec<NamespaceBinding>) -> Result<()> {
        let declared = declarations
            .iter()
            .find(|declared| declared.prefix() == binding.prefix())
            .map(NamespaceBinding::uri);
        let current = declared.or_else(|| self.scope.resolve(binding.prefix()));

        match current {
            Some(uri) if uri == binding.uri() => Ok(()),
            Some(uri) if binding.prefix().is_some() || declared.is_some() => {
                Err(Diagnostic::error(format!(
                    "extension content needs `{}` bound to `{}` but it is bound to `{uri}`",
                    binding.attribute_name(),
                    binding.uri()
                ))
                .with_code(ErrorCode::E303))
            }
            _ => {
                declarations.push(binding.clone());
                Ok(())
            }
        }
    }

    /// Attributes are unqualified unless another namespace added them to the
    /// owning type with `extends`.
    fn attribute_name(&self, ty: &TypeDescriptor, property: &PropertyDescriptor) -> Result<String> {
        if is_foreign_attribute(ty, property) {
            self.property_name(property)
        } else {
            Ok(property.name().to_string())
        }
    }

    fn property_name(&self, property: &PropertyDescriptor) -> Result<String> {
        Ok(qualify(self.prefix(property.namespace())?, property.name()))
    }

    fn type_element(&self, ty: &TypeDescriptor) -> Result<String> {
        Ok(qualify(self.prefix(ty.namespace())?, ty.tag()))
    }

    fn prefix(&self, uri: &str) -> Result<&'r str> {
        self.registry
            .namespace(uri)
            .map(|namespace| namespace.prefix())
            .ok_or_else(|| {
                Diagnostic::error(format!("namespace `{uri}` is not registered"))
                    .with_code(ErrorCode::E300)
            })
    }

    fn resolve(&self, type_name: &str) -> Result<&'r TypeDescriptor> {
        self.registry
            .resolve_type(type_name)
            .map_err(|err| Diagnostic::error(err.to_string()).with_code(ErrorCode::E300))
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(|err| {
            Diagnostic::error(format!("failed to write markup: {err}")).with_code(ErrorCode::E304)
        })
    }
}

fn known_type<'r>(registry: &'r Registry, instance: &Instance) -> Result<&'r TypeDescriptor> {
    registry.resolve_type(instance.type_name()).map_err(|err| {
        Diagnostic::error(format!("cannot write `{}`: {err}", instance.type_name()))
            .with_code(ErrorCode::E300)
    })
}

/// Bindings the extension content of an instance depends on.
fn extension_bindings(instance: &Instance) -> Vec<&NamespaceBinding> {
    let attributes = instance
        .extension_attributes()
        .iter()
        .filter_map(|attribute| attribute.binding());
    let elements = instance
        .extension_elements()
        .iter()
        .flat_map(|element| element.bindings());
    let slots = instance
        .properties()
        .flat_map(|(_, value)| value.items())
        .filter_map(Value::as_extension)
        .flat_map(|extension| extension.bindings());
    attributes.chain(elements).chain(slots).collect()
}

fn is_foreign_attribute(ty: &TypeDescriptor, property: &PropertyDescriptor) -> bool {
    property.is_attribute() && property.is_extension() && property.namespace() != ty.namespace()
}

fn objects<'v>(property: &PropertyDescriptor, value: &'v Value) -> Result<Vec<&'v ObjectRef>> {
    value
        .items()
        .iter()
        .map(|item| item.as_object().ok_or_else(|| wrong_kind(property)))
        .collect()
}

fn mismatch(message: String) -> Diagnostic {
    Diagnostic::error(message).with_code(ErrorCode::E304)
}

fn wrong_kind(property: &PropertyDescriptor) -> Diagnostic {
    mismatch(format!("property `{}` holds a value of the wrong kind", property.name()))
}

//! Markup to instance graph.
//!
//! A read is one depth-first pass over `quick_xml` events. Each element is
//! typed through the registry as soon as its start tag is seen, so a root of
//! the wrong type is rejected before any of its children are looked at.
//! References are collected on a work-list and linked once the whole tree
//! exists.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info, trace};
use quick_xml::events::{BytesStart, Event};

use tessera_core::{
    Instance, ObjectRef, PrimitiveType, Reference, Registry, Value,
    descriptor::ElementStyle,
    extension::{ExtensionAttribute, ExtensionElement},
    qname::QName,
    registry::{PropertyDescriptor, PropertyType, TypeDescriptor, XSI_NAMESPACE},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, MappingError, Result},
    extension::Capture,
    namespace::{NamespaceScope, declarations, is_declaration, malformed, unbound},
    options::ReadOptions,
    references::Pending,
    span::Span,
};

/// The result of a successful read.
#[derive(Debug)]
pub struct Document {
    root: ObjectRef,
    warnings: Vec<Diagnostic>,
    ids: IndexMap<String, ObjectRef>,
}

impl Document {
    /// The root instance.
    pub fn root(&self) -> &ObjectRef {
        &self.root
    }

    pub fn into_root(self) -> ObjectRef {
        self.root
    }

    /// Everything a lenient read tolerated.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// The element carrying `id`.
    pub fn element_by_id(&self, id: &str) -> Option<&ObjectRef> {
        self.ids.get(id)
    }

    /// All identified elements in document order.
    pub fn ids(&self) -> impl Iterator<Item = (&str, &ObjectRef)> {
        self.ids.iter().map(|(id, object)| (id.as_str(), object))
    }
}

/// Reads documents into instance graphs typed by a [`Registry`].
///
/// # Example
///
/// ```
/// use tessera_core::Registry;
/// use tessera_xml::{ReadOptions, Reader};
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
/// let reader = Reader::new(&registry, ReadOptions::default());
/// let document = reader
///     .read(r#"<n:Note xmlns:n="urn:notes" id="n1">Hello</n:Note>"#, Some("n:Note"))
///     .unwrap();
///
/// assert_eq!(document.root().get("text").unwrap().as_str(), Some("Hello"));
/// assert!(document.element_by_id("n1").is_some());
/// ```
pub struct Reader<'r> {
    registry: &'r Registry,
    options: ReadOptions,
}

impl<'r> Reader<'r> {
    pub fn new(registry: &'r Registry, options: ReadOptions) -> Self {
        Self { registry, options }
    }

    /// Read a document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The document text
    /// * `expected_root` - Qualified name of the type the root must be, or a
    ///   supertype of it
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] for malformed markup, content that does not
    /// fit the registry, or references to ids the document does not contain.
    pub fn read(&self, xml: &str, expected_root: Option<&str>) -> std::result::Result<Document, MappingError> {
        info!(
            bytes = xml.len(),
            strict = self.options.strict(),
            fragment = self.options.fragment();
            "Reading document"
        );

        let expected = expected_root
            .map(|name| {
                self.registry.resolve_type(name).map_err(|err| {
                    Diagnostic::error(format!("expected root type is not usable: {err}"))
                        .with_code(ErrorCode::E102)
                })
            })
            .transpose()?;

        let mut pass = Pass::new(self.registry, self.options, xml);
        match pass.document(expected) {
            Ok(root) => pass.finish(root),
            Err(error) => Err(pass.diagnostics.fail(error)),
        }
    }
}

/// One piece of element content, with comments and instructions skipped.
enum Content<'x> {
    Start(BytesStart<'x>, Span),
    Empty(BytesStart<'x>, Span),
    Text(String, Span),
    End,
}

/// The state of one read call.
struct Pass<'x, 'r> {
    registry: &'r Registry,
    options: ReadOptions,
    xml: quick_xml::Reader<&'x [u8]>,
    scope: NamespaceScope,
    pending: Pending,
    ids: IndexMap<String, ObjectRef>,
    id_spans: HashMap<String, Span>,
    diagnostics: DiagnosticCollector,
    elements: usize,
}

impl<'x, 'r> Pass<'x, 'r> {
    fn new(registry: &'r Registry, options: ReadOptions, xml: &'x str) -> Self {
        Self {
            registry,
            options,
            xml: quick_xml::Reader::from_str(xml),
            scope: NamespaceScope::new(),
            pending: Pending::new(),
            ids: IndexMap::new(),
            id_spans: HashMap::new(),
            diagnostics: DiagnosticCollector::new(),
            elements: 0,
        }
    }

    fn document(&mut self, expected: Option<&'r TypeDescriptor>) -> Result<ObjectRef> {
        let root = loop {
            let (event, span) = self.next_raw()?;
            match event {
                Event::Start(start) => break self.root(&start, span, false, expected)?,
                Event::Empty(start) => break self.root(&start, span, true, expected)?,
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
                Event::Text(_) | Event::CData(_) | Event::End(_) => {
                    return Err(malformed("content before the root element", span));
                }
                Event::Eof => {
                    return Err(Diagnostic::error("document has no root element")
                        .with_code(ErrorCode::E006)
                        .with_label(span, "expected an element"));
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
            }
        };

        loop {
            let (event, span) = self.next_raw()?;
            match event {
                Event::Eof => break,
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
                Event::Comment(_) | Event::PI(_) => {}
                _ => {
                    return Err(Diagnostic::error("content after the root element")
                        .with_code(ErrorCode::E005)
                        .with_label(span, "a document has exactly one root"));
                }
            }
        }

        Ok(root)
    }

    fn finish(self, root: ObjectRef) -> std::result::Result<Document, MappingError> {
        let Self {
            options,
            pending,
            ids,
            diagnostics,
            elements,
            ..
        } = self;

        let references = pending.len();
        let unresolved = pending.resolve(&ids);
        debug!(references, unresolved = unresolved.len(); "References resolved");

        if !unresolved.is_empty() {
            if options.fragment() {
                debug!(unresolved = unresolved.len(); "Keeping references that leave the fragment");
            } else {
                let mut missing: Vec<String> = Vec::new();
                let mut labels = Vec::new();
                for entry in &unresolved {
                    if !missing.iter().any(|id| id == entry.id()) {
                        missing.push(entry.id().to_string());
                        labels.push((entry.span(), format!("no element has id `{}`", entry.id())));
                    }
                }

                let listed: Vec<String> = missing.iter().map(|id| format!("`{id}`")).collect();
                let mut diagnostic = Diagnostic::error(format!(
                    "unresolved reference{} {}",
                    if missing.len() == 1 { "" } else { "s" },
                    listed.join(", ")
                ))
                .with_code(ErrorCode::E200)
                .with_help("read the document as a fragment to keep references that leave it");
                for (span, message) in labels {
                    diagnostic = diagnostic.with_label(span, message);
                }

                return Err(diagnostics.dangling(diagnostic, missing));
            }
        }

        info!(elements, ids = ids.len(), warnings = diagnostics.len(); "Document read");
        Ok(Document {
            root,
            warnings: diagnostics.into_warnings(),
            ids,
        })
    }

    fn root(
        &mut self,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
        expected: Option<&'r TypeDescriptor>,
    ) -> Result<ObjectRef> {
        let registry = self.registry;
        self.scoped(start, span, |pass| {
            let name = tag_name(start, span)?;
            let (uri, local) = pass.scope.element_name(name, span)?;
            let ty = uri
                .as_deref()
                .and_then(|uri| registry.type_for_tag(uri, local));

            let ty = match (ty, expected) {
                (Some(ty), Some(expected)) if !registry.is_assignable(ty.name(), expected.name()) => {
                    return Err(root_mismatch(name, Some(ty), expected, span));
                }
                (None, Some(expected)) => return Err(root_mismatch(name, None, expected, span)),
                (None, None) => {
                    return Err(Diagnostic::error(format!("unknown root element `{name}`"))
                        .with_code(ErrorCode::E100)
                        .with_label(span, "no registered type has this element name"));
                }
                (Some(ty), _) => ty,
            };

            debug!(root = ty.name(); "Root element recognized");
            pass.object(ty, start, span, empty)
        })
    }

    /// Build the instance for one element of a known type.
    fn object(
        &mut self,
        ty: &'r TypeDescriptor,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<ObjectRef> {
        if ty.is_abstract() {
            return Err(Diagnostic::error(format!(
                "type `{}` is abstract and cannot be instantiated",
                ty.name()
            ))
            .with_code(ErrorCode::E107)
            .with_label(span, "element of an abstract type")
            .with_help("name a concrete subtype with `xsi:type`"));
        }

        trace!(type_name = ty.name(); "Reading element");
        self.elements += 1;
        let object = ObjectRef::new(Instance::new(ty.name()));
        self.attributes(&object, ty, start, span)?;
        self.register_id(&object, span)?;

        let registry = self.registry;
        let body = registry
            .effective_properties(ty)
            .iter()
            .find(|property| property.is_body());

        let mut text = String::new();
        let mut text_span: Option<Span> = None;
        if !empty {
            loop {
                match self.next_content()? {
                    Content::End => break,
                    Content::Text(chunk, chunk_span) => {
                        if body.is_some() {
                            text.push_str(&chunk);
                            text_span = Some(text_span.map_or(chunk_span, |seen| seen.union(chunk_span)));
                        } else if !chunk.trim().is_empty() {
                            self.unexpected_text(
                                Diagnostic::error(format!("unexpected text in `{}`", ty.name()))
                                    .with_code(ErrorCode::E103)
                                    .with_label(chunk_span, "this type has no body property"),
                            )?;
                        }
                    }
                    Content::Start(child, child_span) => {
                        self.child(&object, ty, &child, child_span, false)?;
                    }
                    Content::Empty(child, child_span) => {
                        self.child(&object, ty, &child, child_span, true)?;
                    }
                }
            }
        }

        if let Some(body) = body {
            if !text.trim().is_empty() {
                let value = self.primitive(body, &text, text_span.unwrap_or(span))?;
                object.set(body.name(), value);
            }
        }

        Ok(object)
    }

    fn attributes(
        &mut self,
        object: &ObjectRef,
        ty: &'r TypeDescriptor,
        start: &BytesStart<'x>,
        span: Span,
    ) -> Result<()> {
        let registry = self.registry;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| malformed(err, span))?;
            let key = std::str::from_utf8(attribute.key.as_ref()).map_err(|err| malformed(err, span))?;
            if is_declaration(key) {
                continue;
            }
            let value = attribute.unescape_value().map_err(|err| escape(err, span))?;

            let qname = QName::parse(key);
            let uri = match qname.prefix() {
                Some(prefix) => Some(
                    self.scope
                        .resolve(Some(prefix))
                        .ok_or_else(|| unbound(prefix, span))?
                        .to_string(),
                ),
                None => None,
            };

            let is_xsi = uri.as_deref() == Some(XSI_NAMESPACE);
            if is_xsi && qname.local() == "type" {
                continue;
            }

            let property = registry
                .effective_properties(ty)
                .iter()
                .filter(|property| property.is_attribute() && property.name() == qname.local())
                .find(|property| match uri.as_deref() {
                    None => !property.is_extension() || property.namespace() == ty.namespace(),
                    Some(uri) if uri == ty.namespace() => {
                        !property.is_extension() || property.namespace() == uri
                    }
                    Some(uri) => property.is_extension() && property.namespace() == uri,
                });

            match property {
                Some(property) => {
                    if let Some(value) = self.attribute_value(object, property, &value, span)? {
                        object.set(property.name(), value);
                    }
                }
                None => {
                    if !is_xsi {
                        self.tolerate(
                            Diagnostic::error(format!("unknown attribute `{key}` on `{}`", ty.name()))
                                .with_code(ErrorCode::E101)
                                .with_label(span, "in this element"),
                        )?;
                    }
                    trace!(attribute = key; "Keeping unknown attribute");
                    let binding = qname
                        .prefix()
                        .and_then(|prefix| self.scope.binding(Some(prefix)))
                        .cloned();
                    object
                        .borrow_mut()
                        .push_extension_attribute(ExtensionAttribute::new(key, value, binding));
                }
            }
        }
        Ok(())
    }

    fn attribute_value(
        &mut self,
        object: &ObjectRef,
        property: &'r PropertyDescriptor,
        lexical: &str,
        span: Span,
    ) -> Result<Option<Value>> {
        if property.is_reference() {
            if property.is_many() {
                let items = lexical
                    .split_whitespace()
                    .enumerate()
                    .map(|(slot, raw)| {
                        let id = reference_id(raw);
                        self.pending.push(object, property.name(), Some(slot), id, span);
                        Value::Reference(Reference::Unresolved(id.to_string()))
                    })
                    .collect();
                return Ok(Some(Value::List(items)));
            }

            let id = reference_id(lexical.trim());
            if id.is_empty() {
                return Ok(None);
            }
            self.pending.push(object, property.name(), None, id, span);
            return Ok(Some(Reference::Unresolved(id.to_string()).into()));
        }

        if property.is_many() {
            let items = lexical
                .split_whitespace()
                .map(|item| self.primitive(property, item, span))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(Value::List(items)));
        }
        self.primitive(property, lexical, span).map(Some)
    }

    /// Parse one primitive lexical value, keeping the raw string when lenient.
    fn primitive(&mut self, property: &PropertyDescriptor, lexical: &str, span: Span) -> Result<Value> {
        let primitive = property.ty().as_primitive().unwrap_or(PrimitiveType::String);
        match primitive.parse(lexical) {
            Ok(scalar) => Ok(Value::Scalar(scalar)),
            Err(reason) => {
                self.tolerate(
                    Diagnostic::error(format!("invalid value for `{}`: {reason}", property.name()))
                        .with_code(ErrorCode::E104)
                        .with_label(span, format!("expected {primitive}")),
                )?;
                Ok(Value::from(lexical))
            }
        }
    }

    fn register_id(&mut self, object: &ObjectRef, span: Span) -> Result<()> {
        let Some(id) = self.registry.identity_of(&object.borrow()) else {
            return Ok(());
        };

        if let Some(&first) = self.id_spans.get(&id) {
            return self.tolerate(
                Diagnostic::error(format!("id `{id}` is used by more than one element"))
                    .with_code(ErrorCode::E105)
                    .with_label(span, "duplicate id")
                    .with_secondary_label(first, "first used here")
                    .with_help("references resolve to the first element"),
            );
        }

        self.id_spans.insert(id.clone(), span);
        self.ids.insert(id, object.clone());
        Ok(())
    }

    fn child(
        &mut self,
        object: &ObjectRef,
        ty: &'r TypeDescriptor,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<()> {
        self.scoped(start, span, |pass| pass.child_in_scope(object, ty, start, span, empty))
    }

    fn child_in_scope(
        &mut self,
        object: &ObjectRef,
        ty: &'r TypeDescriptor,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<()> {
        let registry = self.registry;
        let name = tag_name(start, span)?;
        let (uri, local) = self.scope.element_name(name, span)?;
        let properties = registry.effective_properties(ty);

        // A property-named element.
        let named = properties.iter().find(|property| {
            property.is_element()
                && property.style() != ElementStyle::Type
                && property.name() == local
                && match uri.as_deref() {
                    Some(uri) => property.namespace() == uri,
                    None => !property.is_extension(),
                }
        });
        if let Some(property) = named {
            return self.property_element(object, ty, property, start, span, empty);
        }

        // A type-named element filling the first property that accepts it.
        if let Some(child_type) = uri
            .as_deref()
            .and_then(|uri| registry.type_for_tag(uri, local))
        {
            let slot = properties.iter().find(|property| {
                property.is_element()
                    && property.style() == ElementStyle::Type
                    && property
                        .ty()
                        .as_type()
                        .is_some_and(|declared| registry.is_assignable(child_type.name(), declared))
            });
            if let Some(property) = slot {
                let child = self.object(child_type, start, span, empty)?;
                self.assign(object, property, child.into(), span)?;
                return Ok(());
            }
        }

        let extension = self.unknown_element(ty, name, uri, start, span, empty)?;
        self.keep(object, ty, extension, span)
    }

    /// Store captured markup in the `any` slot of `ty`, or with the instance's
    /// extension elements when it has none.
    fn keep(
        &mut self,
        object: &ObjectRef,
        ty: &'r TypeDescriptor,
        extension: ExtensionElement,
        span: Span,
    ) -> Result<()> {
        let registry = self.registry;
        match registry
            .effective_properties(ty)
            .iter()
            .find(|property| property.is_element() && property.is_any())
        {
            Some(property) => self.assign(object, property, extension.into(), span).map(|_| ()),
            None => {
                object.borrow_mut().push_extension_element(extension);
                Ok(())
            }
        }
    }

    fn unknown_element(
        &mut self,
        ty: &'r TypeDescriptor,
        name: &str,
        uri: Option<String>,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<ExtensionElement> {
        let registry = self.registry;
        let has_slot = registry
            .effective_properties(ty)
            .iter()
            .any(|property| property.is_element() && property.is_any());
        if !has_slot {
            self.tolerate(
                Diagnostic::error(format!("unknown element `{name}` in `{}`", ty.name()))
                    .with_code(ErrorCode::E100)
                    .with_label(span, "not described by the registry"),
            )?;
        }

        debug!(element = name, host = ty.name(); "Keeping unknown element verbatim");
        self.capture(name, uri, start, span, empty)
    }

    fn property_element(
        &mut self,
        object: &ObjectRef,
        ty: &'r TypeDescriptor,
        property: &'r PropertyDescriptor,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<()> {
        if property.is_reference() {
            return self.reference_element(object, property, start, span, empty);
        }

        match property.ty() {
            PropertyType::Any => {
                let name = tag_name(start, span)?;
                let (uri, _) = self.scope.element_name(name, span)?;
                let extension = self.capture(name, uri, start, span, empty)?;
                self.assign(object, property, extension.into(), span)?;
            }
            PropertyType::Primitive(_) => {
                let text = self.text_content(span, empty)?;
                let value = self.primitive(property, &text, span)?;
                self.assign(object, property, value, span)?;
            }
            PropertyType::Type(declared) => {
                if property.style() == ElementStyle::Wrapped {
                    return self.wrapped(object, ty, property, declared, span, empty);
                }
                let actual = self.xsi_type(start, span, declared)?;
                let child = self.object(actual, start, span, empty)?;
                self.assign(object, property, child.into(), span)?;
            }
        }
        Ok(())
    }

    fn reference_element(
        &mut self,
        object: &ObjectRef,
        property: &'r PropertyDescriptor,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<()> {
        let mut href = None;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| malformed(err, span))?;
            if attribute.key.as_ref() == b"href" {
                href = Some(attribute.unescape_value().map_err(|err| escape(err, span))?);
            }
        }
        self.skip(empty)?;

        let id = href.as_deref().map(|href| reference_id(href.trim())).unwrap_or_default();
        if id.is_empty() {
            return self.tolerate(
                Diagnostic::error(format!("reference `{}` has no `href`", property.name()))
                    .with_code(ErrorCode::E104)
                    .with_label(span, "expected href=\"#id\""),
            );
        }

        let slot = property
            .is_many()
            .then(|| object.get(property.name()).map_or(0, |value| value.items().len()));
        if self.assign(object, property, Reference::Unresolved(id.to_string()).into(), span)? {
            self.pending.push(object, property.name(), slot, id, span);
        }
        Ok(())
    }

    /// Read the children of a wrapper element into a list property.
    ///
    /// Items the registry does not describe are kept on the owner, like any
    /// other unknown child.
    fn wrapped(
        &mut self,
        object: &ObjectRef,
        owner: &'r TypeDescriptor,
        property: &'r PropertyDescriptor,
        declared: &str,
        span: Span,
        empty: bool,
    ) -> Result<()> {
        if empty {
            return Ok(());
        }
        loop {
            let (item, item_span, item_empty) = match self.next_content()? {
                Content::End => return Ok(()),
                Content::Text(text, text_span) => {
                    if !text.trim().is_empty() {
                        self.unexpected_text(
                            Diagnostic::error(format!("unexpected text in `{}`", property.name()))
                                .with_code(ErrorCode::E103)
                                .with_label(text_span, "only elements are allowed here"),
                        )?;
                    }
                    continue;
                }
                Content::Start(item, item_span) => (item, item_span, false),
                Content::Empty(item, item_span) => (item, item_span, true),
            };

            let registry = self.registry;
            self.scoped(&item, item_span, |pass| {
                let name = tag_name(&item, item_span)?;
                let (uri, local) = pass.scope.element_name(name, item_span)?;
                let item_type = uri
                    .as_deref()
                    .and_then(|uri| registry.type_for_tag(uri, local))
                    .filter(|item_type| registry.is_assignable(item_type.name(), declared));

                match item_type {
                    Some(item_type) => {
                        let child = pass.object(item_type, &item, item_span, item_empty)?;
                        pass.assign(object, property, child.into(), item_span)?;
                        Ok(())
                    }
                    None => {
                        pass.tolerate(
                            Diagnostic::error(format!("unknown element `{name}` in `{}`", property.name()))
                                .with_code(ErrorCode::E100)
                                .with_label(item_span, format!("expected an element of type `{declared}`")),
                        )?;
                        debug!(element = name, wrapper = property.name(); "Keeping unknown item verbatim");
                        let extension = pass.capture(name, uri, &item, item_span, item_empty)?;
                        pass.keep(object, owner, extension, item_span)
                    }
                }
            })?;
            trace!(property = property.name(), wrapper = span.start(); "Wrapped item read");
        }
    }

    /// The type an element of a property-named object property instantiates.
    fn xsi_type(&self, start: &BytesStart<'x>, span: Span, declared: &str) -> Result<&'r TypeDescriptor> {
        let registry = self.registry;
        let declared_type = registry.resolve_type(declared).map_err(|err| {
            Diagnostic::error(err.to_string())
                .with_code(ErrorCode::E106)
                .with_label(span, "while reading this element")
        })?;

        let mut named = None;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| malformed(err, span))?;
            let key = std::str::from_utf8(attribute.key.as_ref()).map_err(|err| malformed(err, span))?;
            let qname = QName::parse(key);
            if qname.local() == "type"
                && qname.prefix().is_some()
                && self.scope.resolve(qname.prefix()) == Some(XSI_NAMESPACE)
            {
                named = Some(attribute.unescape_value().map_err(|err| escape(err, span))?);
            }
        }
        let Some(named) = named else {
            return Ok(declared_type);
        };

        let qname = QName::parse(named.trim());
        let uri = match qname.prefix() {
            Some(prefix) => Some(self.scope.resolve(Some(prefix)).ok_or_else(|| unbound(prefix, span))?),
            None => self.scope.resolve(None),
        };
        let actual = uri
            .and_then(|uri| registry.type_by_local(uri, qname.local()))
            .ok_or_else(|| {
                Diagnostic::error(format!("unknown type `{named}` in xsi:type"))
                    .with_code(ErrorCode::E106)
                    .with_label(span, "in this element")
            })?;

        if !registry.is_assignable(actual.name(), declared_type.name()) {
            return Err(Diagnostic::error(format!(
                "xsi:type `{}` is not a subtype of `{}`",
                actual.name(),
                declared_type.name()
            ))
            .with_code(ErrorCode::E106)
            .with_label(span, "in this element"));
        }
        trace!(declared, actual = actual.name(); "Element type selected by xsi:type");
        Ok(actual)
    }

    /// Store `value`, returning `false` if a lenient read dropped it.
    fn assign(
        &mut self,
        object: &ObjectRef,
        property: &PropertyDescriptor,
        value: Value,
        span: Span,
    ) -> Result<bool> {
        if property.is_many() {
            object.push(property.name(), value);
            return Ok(true);
        }
        if object.borrow().is_set(property.name()) {
            self.tolerate(
                Diagnostic::error(format!("property `{}` is given more than once", property.name()))
                    .with_code(ErrorCode::E108)
                    .with_label(span, "repeated here")
                    .with_help("the first occurrence is kept"),
            )?;
            return Ok(false);
        }
        object.set(property.name(), value);
        Ok(true)
    }

    fn capture(
        &mut self,
        name: &str,
        uri: Option<String>,
        start: &BytesStart<'x>,
        span: Span,
        empty: bool,
    ) -> Result<ExtensionElement> {
        let mut capture = Capture::new();
        let first = if empty {
            Event::Empty(start.borrow())
        } else {
            Event::Start(start.borrow())
        };
        let mut done = capture.event(&first, span)?;
        while !done {
            let (event, event_span) = self.next_raw()?;
            if let Event::Eof = event {
                return Err(unexpected_end(event_span));
            }
            done = capture.event(&event, event_span)?;
        }
        capture.finish(name.to_string(), uri, &self.scope, span)
    }

    /// Concatenated text of a primitive-valued element.
    fn text_content(&mut self, span: Span, empty: bool) -> Result<String> {
        let mut text = String::new();
        if empty {
            return Ok(text);
        }
        loop {
            match self.next_content()? {
                Content::End => return Ok(text),
                Content::Text(chunk, _) => text.push_str(&chunk),
                Content::Start(_, child_span) => {
                    self.nested_in_text(child_span, span)?;
                    self.skip(false)?;
                }
                Content::Empty(_, child_span) => self.nested_in_text(child_span, span)?,
            }
        }
    }

    fn nested_in_text(&mut self, child_span: Span, span: Span) -> Result<()> {
        self.tolerate(
            Diagnostic::error("unexpected element inside a text value")
                .with_code(ErrorCode::E100)
                .with_label(child_span, "ignored")
                .with_secondary_label(span, "in this value"),
        )
    }

    /// Consume the rest of an element whose start tag was already read.
    fn skip(&mut self, empty: bool) -> Result<()> {
        if empty {
            return Ok(());
        }
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_content()? {
                Content::Start(..) => depth += 1,
                Content::End => depth -= 1,
                Content::Empty(..) | Content::Text(..) => {}
            }
        }
        Ok(())
    }

    fn scoped<T>(
        &mut self,
        start: &BytesStart<'x>,
        span: Span,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let bindings = declarations(start, span)?;
        self.scope.push(bindings);
        let result = read(self);
        self.scope.pop();
        result
    }

    /// In strict mode, fail with `diagnostic`; otherwise keep it as a warning.
    fn tolerate(&mut self, diagnostic: Diagnostic) -> Result<()> {
        if self.options.strict() {
            return Err(diagnostic);
        }
        debug!(message = diagnostic.message(); "Tolerating content");
        self.diagnostics.tolerate(diagnostic);
        Ok(())
    }

    /// Stray text fails a strict read and is dropped otherwise.
    fn unexpected_text(&self, diagnostic: Diagnostic) -> Result<()> {
        if self.options.strict() {
            return Err(diagnostic);
        }
        debug!(message = diagnostic.message(); "Ignoring text");
        Ok(())
    }

    fn next_content(&mut self) -> Result<Content<'x>> {
        loop {
            let (event, span) = self.next_raw()?;
            return Ok(match event {
                Event::Start(start) => Content::Start(start, span),
                Event::Empty(start) => Content::Empty(start, span),
                Event::End(_) => Content::End,
                Event::Text(text) => {
                    let text = text.unescape().map_err(|err| escape(err, span))?;
                    Content::Text(text.into_owned(), span)
                }
                Event::CData(data) => {
                    let text = String::from_utf8(data.to_vec()).map_err(|err| escape(err, span))?;
                    Content::Text(text, span)
                }
                Event::Eof => return Err(unexpected_end(span)),
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => continue,
            });
        }
    }

    fn next_raw(&mut self) -> Result<(Event<'x>, Span)> {
        let start = self.xml.buffer_position() as usize;
        let event = self.xml.read_event().map_err(|err| {
            let at = self.xml.error_position() as usize;
            Diagnostic::error(format!("malformed markup: {err}"))
                .with_code(ErrorCode::E001)
                .with_label(Span::new(at..at + 1), "here")
        })?;
        let end = self.xml.buffer_position() as usize;
        Ok((event, Span::new(start..end)))
    }
}

fn tag_name<'s>(start: &'s BytesStart<'_>, span: Span) -> Result<&'s str> {
    std::str::from_utf8(start.name().into_inner()).map_err(|err| malformed(err, span))
}

/// Strip the `#` of a fragment reference.
fn reference_id(raw: &str) -> &str {
    raw.strip_prefix('#').unwrap_or(raw)
}

fn root_mismatch(
    name: &str,
    actual: Option<&TypeDescriptor>,
    expected: &TypeDescriptor,
    span: Span,
) -> Diagnostic {
    let found = match actual {
        Some(actual) => format!("found `{}`", actual.name()),
        None => format!("found unknown element `{name}`"),
    };
    Diagnostic::error(format!("root element must be a `{}`", expected.name()))
        .with_code(ErrorCode::E102)
        .with_label(span, found)
}

fn unexpected_end(span: Span) -> Diagnostic {
    Diagnostic::error("unexpected end of document")
        .with_code(ErrorCode::E004)
        .with_label(span, "an element is still open")
}

fn escape(err: impl std::fmt::Display, span: Span) -> Diagnostic {
    Diagnostic::error(format!("invalid escape: {err}"))
        .with_code(ErrorCode::E003)
        .with_label(span, "here")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const FLOW: &str = r#"{
        "name": "Flow", "uri": "urn:flow", "prefix": "f",
        "types": [
            { "name": "Element", "isAbstract": true, "properties": [
                { "name": "id", "type": "String", "isId": true },
                { "name": "label", "type": "String" } ] },
            { "name": "Graph", "superClass": "Element", "properties": [
                { "name": "nodes", "type": "Node", "isMany": true, "style": "type" },
                { "name": "edges", "type": "Edge", "isMany": true, "style": "type" },
                { "name": "groups", "type": "Node", "isMany": true, "style": "wrapped" } ] },
            { "name": "Node", "superClass": "Element", "properties": [
                { "name": "weight", "type": "Integer" },
                { "name": "note", "type": "String", "kind": "element" } ] },
            { "name": "Edge", "superClass": "Element", "properties": [
                { "name": "source", "type": "Node", "kind": "reference" },
                { "name": "targets", "type": "Node", "kind": "reference", "isMany": true } ] }
        ]
    }"#;

    fn registry() -> Registry {
        Registry::builder()
            .register_json(FLOW)
            .unwrap()
            .build()
            .unwrap()
    }

    fn read(xml: &str, options: ReadOptions) -> std::result::Result<Document, MappingError> {
        let registry = registry();
        Reader::new(&registry, options).read(xml, Some("f:Graph"))
    }

    fn first_code(error: &MappingError) -> Option<ErrorCode> {
        error
            .diagnostics()
            .iter()
            .find(|diagnostic| diagnostic.severity().is_error())
            .and_then(Diagnostic::code)
    }

    #[test]
    fn test_forward_and_backward_references_resolve() {
        let document = read(
            r##"<f:Graph xmlns:f="urn:flow" id="g">
                 <f:Edge id="e1" source="#n1" targets="#n1 n2"/>
                 <f:Node id="n1" weight="3"><f:note>first</f:note></f:Node>
                 <f:Node id="n2"/>
               </f:Graph>"##,
            ReadOptions::default(),
        )
        .unwrap();

        let n1 = document.element_by_id("n1").unwrap();
        let n2 = document.element_by_id("n2").unwrap();
        let edge = document.element_by_id("e1").unwrap();

        let source = edge.get("source").unwrap();
        assert!(source.as_reference().unwrap().target().unwrap().ptr_eq(n1));
        let targets = edge.get("targets").unwrap();
        let targets: Vec<ObjectRef> = targets
            .items()
            .iter()
            .map(|item| item.as_reference().unwrap().target().unwrap())
            .collect();
        assert!(targets[0].ptr_eq(n1));
        assert!(targets[1].ptr_eq(n2));

        assert_eq!(n1.get("weight").unwrap().as_integer(), Some(3));
        assert_eq!(n1.get("note").unwrap().as_str(), Some("first"));
        assert!(document.warnings().is_empty());
        assert_eq!(
            document.ids().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["g", "e1", "n1", "n2"]
        );
    }

    #[test]
    fn test_dangling_reference_names_missing_ids() {
        let error = read(
            r##"<f:Graph xmlns:f="urn:flow">
                 <f:Edge source="#ghost" targets="#ghost #other"/>
               </f:Graph>"##,
            ReadOptions::default(),
        )
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::DanglingReference);
        assert_eq!(first_code(&error), Some(ErrorCode::E200));
        assert_eq!(error.unresolved_ids(), ["ghost", "other"]);
    }

    #[test]
    fn test_fragment_keeps_placeholders() {
        let document = read(
            r##"<f:Graph xmlns:f="urn:flow"><f:Edge source="#outside"/></f:Graph>"##,
            ReadOptions::default().with_fragment(true),
        )
        .unwrap();

        let edges = document.root().get("edges").unwrap();
        let edge = edges.items()[0].as_object().unwrap();
        let source = edge.get("source").unwrap();
        assert_eq!(source.as_reference().unwrap().unresolved_id(), Some("outside"));
    }

    #[test]
    fn test_unknown_attribute_lenient_and_strict() {
        let xml = r#"<f:Graph xmlns:f="urn:flow" xmlns:x="urn:x" x:color="red"/>"#;

        let document = read(xml, ReadOptions::default()).unwrap();
        assert_eq!(document.warnings().len(), 1);
        assert_eq!(document.warnings()[0].code(), Some(ErrorCode::E101));
        let root = document.root().borrow();
        let attribute = &root.extension_attributes()[0];
        assert_eq!(attribute.name(), "x:color");
        assert_eq!(attribute.value(), "red");
        assert_eq!(attribute.binding().map(|binding| binding.uri()), Some("urn:x"));
        drop(root);

        let error = read(xml, ReadOptions::default().with_strict(true)).unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E101));
    }

    #[test]
    fn test_unknown_element_is_kept_verbatim() {
        let document = read(
            r#"<f:Graph xmlns:f="urn:flow"><f:Extra a="1"><f:inner/></f:Extra></f:Graph>"#,
            ReadOptions::default(),
        )
        .unwrap();

        let root = document.root().borrow();
        let extension = &root.extension_elements()[0];
        assert_eq!(extension.markup(), r#"<f:Extra a="1"><f:inner/></f:Extra>"#);
        assert_eq!(extension.namespace(), Some("urn:flow"));
        assert_eq!(extension.bindings()[0].prefix(), Some("f"));
        assert_eq!(document.warnings()[0].code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_unknown_wrapped_item_is_kept() {
        let registry = registry();
        let xml = concat!(
            r#"<f:Graph xmlns:f="urn:flow" xmlns:x="urn:x">"#,
            r#"<f:groups><f:Node id="n1"/><x:Future a="1"/></f:groups>"#,
            "</f:Graph>"
        );

        let document = Reader::new(&registry, ReadOptions::default())
            .read(xml, Some("f:Graph"))
            .unwrap();
        assert_eq!(document.warnings()[0].code(), Some(ErrorCode::E100));
        assert_eq!(document.root().get("groups").unwrap().items().len(), 1);
        {
            let root = document.root().borrow();
            let extension = &root.extension_elements()[0];
            assert_eq!(extension.markup(), r#"<x:Future a="1"/>"#);
            assert_eq!(extension.namespace(), Some("urn:x"));
        }

        let markup = crate::Writer::new(&registry, crate::WriteOptions::default().with_xml_declaration(false))
            .write(document.root())
            .unwrap();
        assert!(markup.contains(r#"<f:groups><f:Node id="n1"/></f:groups>"#));
        assert!(markup.contains(r#"<x:Future a="1"/>"#));
        assert!(markup.contains(r#"xmlns:x="urn:x""#));

        let error = Reader::new(&registry, ReadOptions::default().with_strict(true))
            .read(xml, Some("f:Graph"))
            .unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E100));
    }

    #[test]
    fn test_root_type_mismatch() {
        let error = read(r#"<f:Node xmlns:f="urn:flow"/>"#, ReadOptions::default()).unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E102));
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_root_of_supertype_is_accepted() {
        let registry = registry();
        let document = Reader::new(&registry, ReadOptions::default())
            .read(r#"<f:Node xmlns:f="urn:flow" id="n"/>"#, Some("f:Element"))
            .unwrap();
        assert_eq!(document.root().type_name(), "f:Node");
    }

    #[test]
    fn test_abstract_element_rejected() {
        let registry = registry();
        let error = Reader::new(&registry, ReadOptions::default())
            .read(r#"<f:Element xmlns:f="urn:flow"/>"#, None)
            .unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E107));
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let xml = r##"<f:Graph xmlns:f="urn:flow">
            <f:Node id="n" label="first"/>
            <f:Node id="n" label="second"/>
            <f:Edge source="#n"/>
        </f:Graph>"##;

        let document = read(xml, ReadOptions::default()).unwrap();
        let target = document.element_by_id("n").unwrap();
        assert_eq!(target.get("label").unwrap().as_str(), Some("first"));
        let warning = &document.warnings()[0];
        assert_eq!(warning.code(), Some(ErrorCode::E105));
        let labels = warning.labels();
        assert!(labels[0].snippet(xml).unwrap().contains("second"));
        assert!(labels[1].is_secondary());
        assert!(labels[1].snippet(xml).unwrap().contains("first"));

        let error = read(xml, ReadOptions::default().with_strict(true)).unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E105));
    }

    #[test]
    fn test_invalid_value_kept_as_text_when_lenient() {
        let document = read(
            r#"<f:Graph xmlns:f="urn:flow"><f:Node weight="heavy"/></f:Graph>"#,
            ReadOptions::default(),
        )
        .unwrap();

        let nodes = document.root().get("nodes").unwrap();
        let node = nodes.items()[0].as_object().unwrap();
        assert_eq!(node.get("weight").unwrap().as_str(), Some("heavy"));
        assert_eq!(document.warnings()[0].code(), Some(ErrorCode::E104));
    }

    #[test]
    fn test_well_formedness_errors() {
        let cases = [
            ("", Some(ErrorCode::E006)),
            (r#"<f:Graph xmlns:f="urn:flow"/><f:Graph xmlns:f="urn:flow"/>"#, Some(ErrorCode::E005)),
            (r#"<g:Graph xmlns:f="urn:flow"/>"#, Some(ErrorCode::E002)),
            (r#"<f:Graph xmlns:f="urn:flow"></f:Node>"#, Some(ErrorCode::E001)),
            (r#"<f:Graph xmlns:f="urn:flow">"#, None),
        ];
        for (xml, code) in cases {
            let error = read(xml, ReadOptions::default()).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Parse, "reading {xml:?}");
            if let Some(code) = code {
                assert_eq!(first_code(&error), Some(code), "reading {xml:?}");
            }
        }
    }

    #[test]
    fn test_comments_and_declaration_are_skipped() {
        let document = read(
            r#"<?xml version="1.0" encoding="UTF-8"?>
               <!-- leading -->
               <f:Graph xmlns:f="urn:flow" label="g"><!-- inside --></f:Graph>
               <!-- trailing -->"#,
            ReadOptions::default(),
        )
        .unwrap();
        assert_eq!(document.root().get("label").unwrap().as_str(), Some("g"));
    }

    #[test]
    fn test_stray_text_dropped_unless_strict() {
        let xml = r#"<f:Graph xmlns:f="urn:flow">stray</f:Graph>"#;

        let document = read(xml, ReadOptions::default()).unwrap();
        assert!(document.warnings().is_empty());

        let error = read(xml, ReadOptions::default().with_strict(true)).unwrap_err();
        assert_eq!(first_code(&error), Some(ErrorCode::E103));
    }
}

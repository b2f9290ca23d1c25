//! Scoped namespace bindings.
//!
//! Every element may declare `xmlns` and `xmlns:prefix` bindings that hold
//! for it and its descendants. [`NamespaceScope`] keeps one frame per open
//! element; lookups walk from the innermost frame outward.

use quick_xml::events::BytesStart;

use tessera_core::{extension::NamespaceBinding, qname::QName, registry::XML_NAMESPACE};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    span::Span,
};

#[derive(Debug, Default)]
pub(crate) struct NamespaceScope {
    frames: Vec<Vec<NamespaceBinding>>,
}

impl NamespaceScope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Open an element's scope.
    pub(crate) fn push(&mut self, bindings: Vec<NamespaceBinding>) {
        self.frames.push(bindings);
    }

    /// Close the innermost scope.
    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// The binding in effect for `prefix`; `None` asks for the default
    /// namespace.
    pub(crate) fn binding(&self, prefix: Option<&str>) -> Option<&NamespaceBinding> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|binding| binding.prefix() == prefix)
    }

    /// The URI `prefix` is bound to. The `xml` prefix is always bound.
    pub(crate) fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.binding(prefix)
            .map(NamespaceBinding::uri)
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve an element name to its namespace URI and local part.
    ///
    /// Unprefixed names take the default namespace, if any.
    pub(crate) fn element_name<'n>(
        &self,
        name: &'n str,
        span: Span,
    ) -> Result<(Option<String>, &'n str)> {
        let qname = QName::parse(name);
        match qname.prefix() {
            Some(prefix) => self
                .resolve(Some(prefix))
                .map(|uri| (Some(uri.to_string()), qname.local()))
                .ok_or_else(|| unbound(prefix, span)),
            None => Ok((self.resolve(None).map(str::to_string), qname.local())),
        }
    }
}

/// The namespace declarations made by one start tag.
pub(crate) fn declarations(start: &BytesStart<'_>, span: Span) -> Result<Vec<NamespaceBinding>> {
    let mut bindings = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| malformed(err, span))?;
        let key = std::str::from_utf8(attribute.key.as_ref()).map_err(|err| malformed(err, span))?;
        let prefix = match key.strip_prefix("xmlns") {
            Some("") => None,
            Some(rest) => match rest.strip_prefix(':') {
                Some(prefix) => Some(prefix.to_string()),
                None => continue,
            },
            None => continue,
        };
        let uri = attribute.unescape_value().map_err(|err| {
            Diagnostic::error(format!("invalid namespace URI: {err}"))
                .with_code(ErrorCode::E003)
                .with_label(span, "in this declaration")
        })?;
        bindings.push(NamespaceBinding::new(prefix, uri.into_owned()));
    }
    Ok(bindings)
}

/// Returns `true` for `xmlns` and `xmlns:prefix` attribute names.
pub(crate) fn is_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

pub(crate) fn unbound(prefix: &str, span: Span) -> Diagnostic {
    Diagnostic::error(format!("namespace prefix `{prefix}` is not declared"))
        .with_code(ErrorCode::E002)
        .with_label(span, "used here")
        .with_help(format!("declare it with `xmlns:{prefix}=\"...\"` on this or an enclosing element"))
}

pub(crate) fn malformed(err: impl std::fmt::Display, span: Span) -> Diagnostic {
    Diagnostic::error(format!("malformed markup: {err}"))
        .with_code(ErrorCode::E001)
        .with_label(span, "in this element")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(prefix: Option<&str>, uri: &str) -> NamespaceBinding {
        NamespaceBinding::new(prefix.map(str::to_string), uri)
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let mut scope = NamespaceScope::new();
        scope.push(vec![binding(Some("a"), "urn:outer")]);
        scope.push(vec![binding(Some("a"), "urn:inner")]);
        assert_eq!(scope.resolve(Some("a")), Some("urn:inner"));

        scope.pop();
        assert_eq!(scope.resolve(Some("a")), Some("urn:outer"));
    }

    #[test]
    fn test_default_namespace_and_undeclaring() {
        let mut scope = NamespaceScope::new();
        scope.push(vec![binding(None, "urn:default")]);
        assert_eq!(scope.resolve(None), Some("urn:default"));

        scope.push(vec![binding(None, "")]);
        assert_eq!(scope.resolve(None), None);
    }

    #[test]
    fn test_xml_prefix_is_predefined() {
        let scope = NamespaceScope::new();
        assert_eq!(scope.resolve(Some("xml")), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_element_name_unbound_prefix() {
        let scope = NamespaceScope::new();
        let err = scope.element_name("dmn:decision", Span::new(0..13)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E002));
    }

    #[test]
    fn test_declarations_of_start_tag() {
        let start = BytesStart::from_content(
            r#"definitions xmlns="urn:a" xmlns:b="urn:b" name="x""#,
            11,
        );
        let bindings = declarations(&start, Span::default()).unwrap();

        assert_eq!(bindings, vec![binding(None, "urn:a"), binding(Some("b"), "urn:b")]);
    }
}

//! Opaque markup preserved for forward compatibility.
//!
//! Content a registry does not describe is carried through a read/write
//! cycle unchanged. Elements keep their exact markup together with the
//! namespace bindings that markup relies on from its ancestors.

/// A namespace declaration: `xmlns="uri"` or `xmlns:prefix="uri"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceBinding {
    prefix: Option<String>,
    uri: String,
}

impl NamespaceBinding {
    pub fn new(prefix: Option<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix,
            uri: uri.into(),
        }
    }

    /// The bound prefix, or `None` for the default namespace.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The declaring attribute name (`xmlns` or `xmlns:prefix`).
    pub fn attribute_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        }
    }
}

/// An element not described by the registry, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionElement {
    name: String,
    namespace: Option<String>,
    markup: String,
    bindings: Vec<NamespaceBinding>,
}

impl ExtensionElement {
    /// Create an extension element.
    ///
    /// # Arguments
    ///
    /// * `name` - The raw tag name, prefix included
    /// * `namespace` - The namespace URI the tag resolved to, if any
    /// * `markup` - The complete element markup, open tag to close tag
    /// * `bindings` - Ancestor namespace declarations the markup depends on
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
        markup: impl Into<String>,
        bindings: Vec<NamespaceBinding>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            markup: markup.into(),
            bindings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn bindings(&self) -> &[NamespaceBinding] {
        &self.bindings
    }
}

/// An attribute not described by the registry, kept on its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAttribute {
    name: String,
    value: String,
    binding: Option<NamespaceBinding>,
}

impl ExtensionAttribute {
    /// Create an extension attribute.
    ///
    /// `binding` is the declaration of the attribute's prefix, when it has one
    /// that is not predefined.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        binding: Option<NamespaceBinding>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            binding,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn binding(&self) -> Option<&NamespaceBinding> {
        self.binding.as_ref()
    }
}

//! Capture of markup the registry does not describe.
//!
//! A [`Capture`] is fed the raw events of one element and re-serializes them
//! unchanged. It also notes every prefix the markup uses without declaring it
//! on an enclosing captured element, so the bindings it inherits from outside
//! can travel with it.

use quick_xml::{Writer, events::{BytesStart, Event}};

use tessera_core::{
    extension::{ExtensionElement, NamespaceBinding},
    qname::QName,
};

use crate::{
    error::Result,
    namespace::{NamespaceScope, is_declaration, malformed, unbound},
    span::Span,
};

pub(crate) struct Capture {
    writer: Writer<Vec<u8>>,
    /// Prefixes declared by each open element, innermost last.
    open: Vec<Vec<Option<String>>>,
    /// Prefixes bound outside the capture, with their first use.
    inherited: Vec<(Option<String>, Span)>,
}

impl Capture {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            open: Vec::new(),
            inherited: Vec::new(),
        }
    }

    /// Record one event. Returns `true` once the captured element is closed.
    pub(crate) fn event(&mut self, event: &Event<'_>, span: Span) -> Result<bool> {
        match event {
            Event::Start(start) => self.note(start, span)?,
            Event::Empty(start) => {
                self.note(start, span)?;
                self.open.pop();
            }
            Event::End(_) => {
                self.open.pop();
            }
            _ => {}
        }
        self.writer
            .write_event(event.borrow())
            .map_err(|err| malformed(err, span))?;
        Ok(self.open.is_empty())
    }

    /// Finish the capture.
    ///
    /// `scope` must still hold the captured element's own frame.
    pub(crate) fn finish(
        self,
        name: String,
        namespace: Option<String>,
        scope: &NamespaceScope,
        span: Span,
    ) -> Result<ExtensionElement> {
        let mut bindings: Vec<NamespaceBinding> = Vec::new();
        for (prefix, used_at) in &self.inherited {
            match (scope.binding(prefix.as_deref()), prefix) {
                (Some(binding), _) => bindings.push(binding.clone()),
                (None, None) => {}
                (None, Some(prefix)) => return Err(unbound(prefix, *used_at)),
            }
        }

        let markup = String::from_utf8(self.writer.into_inner()).map_err(|err| malformed(err, span))?;
        Ok(ExtensionElement::new(name, namespace, markup, bindings))
    }

    /// Open a frame for `start` and note the prefixes it uses.
    fn note(&mut self, start: &BytesStart<'_>, span: Span) -> Result<()> {
        let mut declared = Vec::new();
        let mut used = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| malformed(err, span))?;
            let key = std::str::from_utf8(attribute.key.as_ref()).map_err(|err| malformed(err, span))?;
            if is_declaration(key) {
                declared.push(key.strip_prefix("xmlns:").map(str::to_string));
            } else if let Some(prefix) = QName::parse(key).prefix() {
                if prefix != "xml" {
                    used.push(Some(prefix.to_string()));
                }
            }
        }
        self.open.push(declared);

        let name = std::str::from_utf8(start.name().into_inner()).map_err(|err| malformed(err, span))?;
        self.use_prefix(QName::parse(name).prefix().map(str::to_string), span);
        for prefix in used {
            self.use_prefix(prefix, span);
        }
        Ok(())
    }

    fn use_prefix(&mut self, prefix: Option<String>, span: Span) {
        let local = self.open.iter().any(|declared| declared.contains(&prefix));
        if !local && !self.inherited.iter().any(|(seen, _)| *seen == prefix) {
            self.inherited.push((prefix, span));
        }
    }
}

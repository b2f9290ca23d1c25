//! Read and write options.

/// Options for [`Reader`](crate::Reader).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    strict: bool,
    fragment: bool,
}

impl ReadOptions {
    /// Reject unknown content and invalid values instead of tolerating them.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Keep references whose target is not in the document as unresolved
    /// placeholders instead of failing.
    pub fn with_fragment(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn fragment(&self) -> bool {
        self.fragment
    }
}

/// Options for [`Writer`](crate::Writer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    synthesize_ids: bool,
    xml_declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            synthesize_ids: false,
            xml_declaration: true,
        }
    }
}

impl WriteOptions {
    /// Give referenced instances without identity a generated id.
    ///
    /// Generated ids are written back onto the instances.
    pub fn with_synthesize_ids(mut self, synthesize_ids: bool) -> Self {
        self.synthesize_ids = synthesize_ids;
        self
    }

    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the root.
    pub fn with_xml_declaration(mut self, xml_declaration: bool) -> Self {
        self.xml_declaration = xml_declaration;
        self
    }

    pub fn synthesize_ids(&self) -> bool {
        self.synthesize_ids
    }

    pub fn xml_declaration(&self) -> bool {
        self.xml_declaration
    }
}

//! Error codes for the Tessera diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Markup errors
//! - `E1xx` - Read validation errors
//! - `E2xx` - Reference resolution errors
//! - `E3xx` - Write validation errors

use std::fmt;

use crate::error::ErrorKind;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Markup Errors (E0xx)
    // =========================================================================
    /// Malformed markup.
    ///
    /// The document is not well-formed XML.
    E001,

    /// Unbound namespace prefix.
    ///
    /// An element or attribute uses a prefix no ancestor declares.
    E002,

    /// Invalid escape.
    ///
    /// A character or entity reference could not be decoded.
    E003,

    /// Unexpected end of document.
    ///
    /// The input ended while an element was still open.
    E004,

    /// Content after the root element.
    ///
    /// A document has exactly one root element.
    E005,

    /// Missing root element.
    E006,

    // =========================================================================
    // Read Validation Errors (E1xx)
    // =========================================================================
    /// Unknown element.
    ///
    /// The element matches neither a property nor a type the registry
    /// allows in this position.
    E100,

    /// Unknown attribute.
    ///
    /// The attribute matches no attribute property of the element's type.
    E101,

    /// Root type mismatch.
    ///
    /// The root element's type is neither the expected root type nor one of
    /// its subtypes.
    E102,

    /// Unexpected text.
    ///
    /// Non-whitespace text inside an element whose type has no body property.
    E103,

    /// Invalid value.
    ///
    /// A lexical value is not valid for the property's primitive type.
    E104,

    /// Duplicate id.
    ///
    /// Two elements in one document carry the same identity.
    E105,

    /// Invalid `xsi:type`.
    ///
    /// The named type is unknown or not assignable to the property's type.
    E106,

    /// Abstract type.
    ///
    /// An element would instantiate a type marked abstract.
    E107,

    /// Property given twice.
    ///
    /// A single-valued property appears more than once.
    E108,

    // =========================================================================
    // Reference Errors (E2xx)
    // =========================================================================
    /// Dangling reference.
    ///
    /// No element in the document carries the referenced id.
    E200,

    // =========================================================================
    // Write Validation Errors (E3xx)
    // =========================================================================
    /// Unknown type.
    ///
    /// An instance carries a type name the registry does not know.
    E300,

    /// Missing identity.
    ///
    /// A referenced instance has no id and none may be synthesized.
    E301,

    /// Dropped reference target.
    ///
    /// A resolved reference points at an instance that no longer exists.
    E302,

    /// Namespace prefix conflict.
    ///
    /// Extension content needs a prefix that is already bound to another URI.
    E303,

    /// Value mismatch.
    ///
    /// A property value does not fit the property's descriptor.
    E304,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Markup errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            // Read validation errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            ErrorCode::E107 => "E107",
            ErrorCode::E108 => "E108",
            // Reference errors
            ErrorCode::E200 => "E200",
            // Write validation errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Markup errors
            ErrorCode::E001 => "malformed markup",
            ErrorCode::E002 => "unbound namespace prefix",
            ErrorCode::E003 => "invalid escape",
            ErrorCode::E004 => "unexpected end of document",
            ErrorCode::E005 => "content after the root element",
            ErrorCode::E006 => "missing root element",
            // Read validation errors
            ErrorCode::E100 => "unknown element",
            ErrorCode::E101 => "unknown attribute",
            ErrorCode::E102 => "root type mismatch",
            ErrorCode::E103 => "unexpected text",
            ErrorCode::E104 => "invalid value",
            ErrorCode::E105 => "duplicate id",
            ErrorCode::E106 => "invalid xsi:type",
            ErrorCode::E107 => "abstract type",
            ErrorCode::E108 => "property given twice",
            // Reference errors
            ErrorCode::E200 => "dangling reference",
            // Write validation errors
            ErrorCode::E300 => "unknown type",
            ErrorCode::E301 => "missing identity",
            ErrorCode::E302 => "dropped reference target",
            ErrorCode::E303 => "namespace prefix conflict",
            ErrorCode::E304 => "value mismatch",
        }
    }

    /// The error category this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::E001
            | ErrorCode::E002
            | ErrorCode::E003
            | ErrorCode::E004
            | ErrorCode::E005
            | ErrorCode::E006 => ErrorKind::Parse,
            ErrorCode::E200 => ErrorKind::DanglingReference,
            _ => ErrorKind::Validation,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E105.to_string(), "E105");
        assert_eq!(ErrorCode::E200.to_string(), "E200");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E002.description(), "unbound namespace prefix");
        assert_eq!(ErrorCode::E200.description(), "dangling reference");
        assert_eq!(ErrorCode::E301.description(), "missing identity");
    }

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::E004.kind(), ErrorKind::Parse);
        assert_eq!(ErrorCode::E102.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::E200.kind(), ErrorKind::DanglingReference);
        assert_eq!(ErrorCode::E302.kind(), ErrorKind::Validation);
    }
}

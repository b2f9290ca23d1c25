//! Property values carried by model instances.
//!
//! A [`Value`] is either a [`Scalar`] (the lexical content of an attribute or
//! text node, typed by a [`PrimitiveType`]), a nested object, a reference to
//! another object, an ordered list, or opaque extension markup.

use std::fmt;

use crate::{
    extension::ExtensionElement,
    instance::{ObjectRef, WeakObjectRef},
};

/// Primitive property types understood by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    Real,
    Boolean,
}

impl PrimitiveType {
    /// Map a descriptor type name to a primitive type.
    ///
    /// Accepts the capitalized meta-model names as well as the lowercase
    /// `string`, `number` and `boolean` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" | "string" => Some(Self::String),
            "Integer" | "integer" => Some(Self::Integer),
            "Real" | "real" | "Number" | "number" => Some(Self::Real),
            "Boolean" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Parse a lexical value into a [`Scalar`] of this type.
    ///
    /// # Errors
    ///
    /// Returns a message naming the expected type if `lexical` is not a valid
    /// literal for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_core::{PrimitiveType, Scalar};
    ///
    /// assert_eq!(PrimitiveType::Real.parse("127.5"), Ok(Scalar::Real(127.5)));
    /// assert_eq!(PrimitiveType::Boolean.parse("1"), Ok(Scalar::Boolean(true)));
    /// assert!(PrimitiveType::Integer.parse("12px").is_err());
    /// ```
    pub fn parse(self, lexical: &str) -> Result<Scalar, String> {
        match self {
            Self::String => Ok(Scalar::String(lexical.to_string())),
            Self::Integer => lexical
                .trim()
                .parse::<i64>()
                .map(Scalar::Integer)
                .map_err(|_| format!("`{lexical}` is not a valid integer")),
            Self::Real => parse_real(lexical.trim())
                .map(Scalar::Real)
                .ok_or_else(|| format!("`{lexical}` is not a valid real number")),
            Self::Boolean => match lexical.trim() {
                "true" | "1" => Ok(Scalar::Boolean(true)),
                "false" | "0" => Ok(Scalar::Boolean(false)),
                _ => Err(format!("`{lexical}` is not a valid boolean")),
            },
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Real => "Real",
            Self::Boolean => "Boolean",
        };
        write!(f, "{name}")
    }
}

fn parse_real(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => lexical.parse::<f64>().ok().filter(|value| value.is_finite()),
    }
}

/// A primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl Scalar {
    /// The primitive type of this value.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::String(_) => PrimitiveType::String,
            Self::Integer(_) => PrimitiveType::Integer,
            Self::Real(_) => PrimitiveType::Real,
            Self::Boolean(_) => PrimitiveType::Boolean,
        }
    }

    /// Borrow the string content if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(value) => serde_json::Value::from(value.as_str()),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Real(value) => serde_json::Value::from(*value),
            Self::Boolean(value) => serde_json::Value::from(*value),
        }
    }

    /// Build a scalar of the given type from a JSON literal.
    ///
    /// Strings are parsed lexically, so `"14"` is accepted for a `Real`.
    pub fn from_json(ty: PrimitiveType, value: &serde_json::Value) -> Result<Self, String> {
        match (ty, value) {
            (_, serde_json::Value::String(lexical)) => ty.parse(lexical),
            (PrimitiveType::Integer, serde_json::Value::Number(number)) => number
                .as_i64()
                .map(Self::Integer)
                .ok_or_else(|| format!("`{number}` is not a valid integer")),
            (PrimitiveType::Real, serde_json::Value::Number(number)) => number
                .as_f64()
                .map(Self::Real)
                .ok_or_else(|| format!("`{number}` is not a valid real number")),
            (PrimitiveType::Boolean, serde_json::Value::Bool(flag)) => Ok(Self::Boolean(*flag)),
            _ => Err(format!("`{value}` is not a valid {ty} literal")),
        }
    }
}

/// Lexical form as written to markup.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) if value.is_nan() => write!(f, "NaN"),
            Self::Real(value) if value.is_infinite() => {
                write!(f, "{}", if *value > 0.0 { "INF" } else { "-INF" })
            }
            Self::Real(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// A link from one instance to another, encoded in markup by id.
///
/// Readers store [`Reference::Unresolved`] placeholders while a document is
/// being built and replace them once the target is known. Fragment reads keep
/// placeholders whose target lies outside the fragment.
#[derive(Debug, Clone)]
pub enum Reference {
    /// A raw id whose target has not been linked.
    Unresolved(String),
    /// A link to a live instance.
    Resolved(WeakObjectRef),
}

impl Reference {
    /// Create a resolved reference to `target`.
    pub fn to(target: &ObjectRef) -> Self {
        Self::Resolved(target.downgrade())
    }

    /// The target instance, if resolved and still alive.
    pub fn target(&self) -> Option<ObjectRef> {
        match self {
            Self::Resolved(weak) => weak.upgrade(),
            Self::Unresolved(_) => None,
        }
    }

    /// The raw id of an unresolved placeholder.
    pub fn unresolved_id(&self) -> Option<&str> {
        match self {
            Self::Unresolved(id) => Some(id),
            Self::Resolved(_) => None,
        }
    }

    /// Returns `true` if the reference is linked to an instance.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A property value.
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    Object(ObjectRef),
    Reference(Reference),
    List(Vec<Value>),
    Extension(ExtensionElement),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Scalar(Scalar::Real(value)) => Some(*value),
            Self::Scalar(Scalar::Integer(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Scalar(Scalar::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_extension(&self) -> Option<&ExtensionElement> {
        match self {
            Self::Extension(extension) => Some(extension),
            _ => None,
        }
    }

    /// View the value as a sequence: lists yield their items, anything else
    /// yields itself once.
    pub fn items(&self) -> &[Value] {
        match self {
            Self::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::String(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Integer(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(Scalar::Real(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Boolean(value))
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl From<ExtensionElement> for Value {
    fn from(extension: ExtensionElement) -> Self {
        Self::Extension(extension)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_primitive_from_name_aliases() {
        assert_eq!(PrimitiveType::from_name("number"), Some(PrimitiveType::Real));
        assert_eq!(PrimitiveType::from_name("String"), Some(PrimitiveType::String));
        assert_eq!(PrimitiveType::from_name("dc:Bounds"), None);
    }

    #[test]
    fn test_real_lexical_form_drops_trailing_zero() {
        assert_eq!(Scalar::Real(650.0).to_string(), "650");
        assert_eq!(Scalar::Real(127.5).to_string(), "127.5");
        assert_eq!(Scalar::Real(f64::NEG_INFINITY).to_string(), "-INF");
    }

    #[test]
    fn test_boolean_parse_rejects_yes() {
        assert!(PrimitiveType::Boolean.parse("yes").is_err());
        assert_eq!(
            PrimitiveType::Boolean.parse(" false "),
            Ok(Scalar::Boolean(false))
        );
    }

    #[test]
    fn test_scalar_from_json_number_for_real() {
        let scalar = Scalar::from_json(PrimitiveType::Real, &serde_json::json!(14)).unwrap();
        assert_eq!(scalar, Scalar::Real(14.0));
    }

    #[test]
    fn test_scalar_from_json_type_mismatch() {
        let result = Scalar::from_json(PrimitiveType::Boolean, &serde_json::json!(3));
        assert!(result.is_err());
    }

    #[test]
    fn test_items_of_single_value() {
        let value = Value::from("x");
        assert_eq!(value.items().len(), 1);
        assert_eq!(Value::List(Vec::new()).items().len(), 0);
    }

    proptest! {
        #[test]
        fn prop_real_lexical_form_is_reparsed_exactly(value in proptest::num::f64::NORMAL) {
            let lexical = Scalar::Real(value).to_string();
            prop_assert_eq!(PrimitiveType::Real.parse(&lexical), Ok(Scalar::Real(value)));
        }

        #[test]
        fn prop_integer_lexical_form_is_reparsed_exactly(value in any::<i64>()) {
            let lexical = Scalar::Integer(value).to_string();
            prop_assert_eq!(PrimitiveType::Integer.parse(&lexical), Ok(Scalar::Integer(value)));
        }
    }
}

//! Namespace-qualified names.
//!
//! Both descriptors and markup spell names as `prefix:local`; the prefix is
//! optional. [`QName`] splits such a name without allocating.

use std::fmt;

/// A borrowed `prefix:local` name.
///
/// # Examples
///
/// ```
/// use tessera_core::qname::QName;
///
/// let name = QName::parse("dmn:Decision");
/// assert_eq!(name.prefix(), Some("dmn"));
/// assert_eq!(name.local(), "Decision");
///
/// let bare = QName::parse("Decision");
/// assert_eq!(bare.prefix(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    prefix: Option<&'a str>,
    local: &'a str,
}

impl<'a> QName<'a> {
    /// Split a raw name at its first colon.
    pub fn parse(name: &'a str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix),
                local,
            },
            None => Self {
                prefix: None,
                local: name,
            },
        }
    }

    /// The prefix, if the name carries one.
    pub fn prefix(&self) -> Option<&'a str> {
        self.prefix
    }

    /// The local part of the name.
    pub fn local(&self) -> &'a str {
        self.local
    }
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Join a prefix and a local name into `prefix:local`.
pub fn qualify(prefix: &str, local: &str) -> String {
    format!("{prefix}:{local}")
}

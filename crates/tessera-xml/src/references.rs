//! The pending-reference work-list of one read.
//!
//! While the tree is built every reference is stored as a
//! [`Reference::Unresolved`] placeholder and recorded here along with its
//! exact position. Once the whole document is known, [`Pending::resolve`]
//! links what it can and hands back the rest.

use indexmap::IndexMap;
use log::trace;

use tessera_core::{ObjectRef, Reference, Value};

use crate::span::Span;

/// One placeholder waiting for its target.
#[derive(Debug)]
pub(crate) struct PendingReference {
    object: ObjectRef,
    property: String,
    slot: Option<usize>,
    id: String,
    span: Span,
}

impl PendingReference {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Default)]
pub(crate) struct Pending {
    entries: Vec<PendingReference>,
}

impl Pending {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a placeholder stored at `object.property`, at list index
    /// `slot` for many-valued properties.
    pub(crate) fn push(
        &mut self,
        object: &ObjectRef,
        property: &str,
        slot: Option<usize>,
        id: impl Into<String>,
        span: Span,
    ) {
        self.entries.push(PendingReference {
            object: object.clone(),
            property: property.to_string(),
            slot,
            id: id.into(),
            span,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replace every placeholder whose id is in `ids` with a resolved
    /// reference. Returns the entries left unresolved, in document order.
    pub(crate) fn resolve(self, ids: &IndexMap<String, ObjectRef>) -> Vec<PendingReference> {
        let mut unresolved = Vec::new();
        for entry in self.entries {
            let Some(target) = ids.get(&entry.id) else {
                unresolved.push(entry);
                continue;
            };
            trace!(id = entry.id, property = entry.property; "Resolving reference");

            let mut instance = entry.object.borrow_mut();
            let slot = match (instance.get_mut(&entry.property), entry.slot) {
                (Some(Value::List(items)), Some(index)) => items.get_mut(index),
                (Some(value), None) => Some(value),
                _ => None,
            };
            if let Some(slot) = slot {
                *slot = Value::Reference(Reference::to(target));
            }
        }
        unresolved
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::Instance;

    use super::*;

    #[test]
    fn test_resolve_single_and_list_slots() {
        let source = ObjectRef::new(Instance::new("g:Node"));
        let target = ObjectRef::new(Instance::new("g:Node"));
        source.set("next", Reference::Unresolved("t".to_string()));
        source.set(
            "peers",
            vec![
                Value::Reference(Reference::Unresolved("missing".to_string())),
                Value::Reference(Reference::Unresolved("t".to_string())),
            ],
        );

        let mut pending = Pending::new();
        pending.push(&source, "next", None, "t", Span::new(0..1));
        pending.push(&source, "peers", Some(0), "missing", Span::new(2..3));
        pending.push(&source, "peers", Some(1), "t", Span::new(4..5));
        assert_eq!(pending.len(), 3);

        let ids = IndexMap::from([("t".to_string(), target.clone())]);
        let unresolved = pending.resolve(&ids);

        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].id(), "missing");

        let next = source.get("next").unwrap();
        assert!(next.as_reference().unwrap().target().unwrap().ptr_eq(&target));

        let peers = source.get("peers").unwrap();
        let peers = peers.as_list().unwrap();
        assert_eq!(peers[0].as_reference().unwrap().unresolved_id(), Some("missing"));
        assert!(peers[1].as_reference().unwrap().is_resolved());
    }
}

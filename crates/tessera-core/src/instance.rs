//! Model instances.
//!
//! An [`Instance`] is a type name plus an ordered bag of named property
//! values. Instances are shared through [`ObjectRef`] handles so that
//! references elsewhere in the graph can point at the exact same object.
//!
//! Instances do not carry their registry. Which properties are valid and how
//! they serialize is only meaningful against the [`Registry`](crate::Registry)
//! that typed them.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{
    extension::{ExtensionAttribute, ExtensionElement},
    value::Value,
};

/// A typed object: a qualified type name and its set properties.
///
/// Unset properties are absent from the map; defaults live in the registry.
#[derive(Debug, Clone)]
pub struct Instance {
    type_name: String,
    properties: IndexMap<String, Value>,
    extension_attributes: Vec<ExtensionAttribute>,
    extension_elements: Vec<ExtensionElement>,
}

impl Instance {
    /// Create an empty instance of the given qualified type.
    ///
    /// Prefer [`Registry::create`](crate::Registry::create), which checks that
    /// the type exists and is concrete.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: IndexMap::new(),
            extension_attributes: Vec::new(),
            extension_elements: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get a property value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Get a property value for in-place modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.properties.get_mut(name)
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Append to a list property, creating the list on first use.
    ///
    /// A single value already stored under `name` is turned into a list.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        match self.properties.entry(name.into()) {
            indexmap::map::Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::List(items) => items.push(value),
                single => {
                    let previous = std::mem::replace(single, Value::List(Vec::new()));
                    *single = Value::List(vec![previous, value]);
                }
            },
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(Value::List(vec![value]));
            }
        }
    }

    /// Remove a property, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.properties.shift_remove(name)
    }

    /// Returns `true` if the property has a value.
    pub fn is_set(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Iterate over set properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Attributes kept verbatim because the registry does not describe them.
    pub fn extension_attributes(&self) -> &[ExtensionAttribute] {
        &self.extension_attributes
    }

    pub fn push_extension_attribute(&mut self, attribute: ExtensionAttribute) {
        self.extension_attributes.push(attribute);
    }

    /// The reserved slot for child elements the registry does not describe.
    pub fn extension_elements(&self) -> &[ExtensionElement] {
        &self.extension_elements
    }

    pub fn push_extension_element(&mut self, element: ExtensionElement) {
        self.extension_elements.push(element);
    }
}

/// A shared handle to an [`Instance`].
///
/// Cloning the handle shares the instance. Handles are single-threaded.
#[derive(Debug, Clone)]
pub struct ObjectRef(Rc<RefCell<Instance>>);

impl ObjectRef {
    pub fn new(instance: Instance) -> Self {
        Self(Rc::new(RefCell::new(instance)))
    }

    /// Borrow the instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Instance> {
        self.0.borrow()
    }

    /// Mutably borrow the instance.
    ///
    /// # Panics
    ///
    /// Panics if the instance is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Instance> {
        self.0.borrow_mut()
    }

    /// The qualified type name of the instance.
    pub fn type_name(&self) -> String {
        self.0.borrow().type_name().to_string()
    }

    /// A clone of a property value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    /// Set a property on the instance.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().set(name, value);
    }

    /// Append to a list property on the instance.
    pub fn push(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().push(name, value);
    }

    /// Returns `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a non-owning handle, as stored by references.
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }
}

/// A non-owning handle to an [`Instance`].
///
/// References hold weak handles so that links back to ancestors do not keep
/// a graph alive on their own.
#[derive(Debug, Clone)]
pub struct WeakObjectRef(Weak<RefCell<Instance>>);

impl WeakObjectRef {
    /// Upgrade to a shared handle if the instance is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    /// Returns `true` if this handle points at `object`.
    pub fn points_to(&self, object: &ObjectRef) -> bool {
        Weak::ptr_eq(&self.0, &Rc::downgrade(&object.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Reference;

    #[test]
    fn test_set_preserves_insertion_order() {
        let mut instance = Instance::new("dmn:Decision");
        instance.set("name", "Decision");
        instance.set("id", "Decision_1");

        let names: Vec<&str> = instance.properties().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "id"]);
    }

    #[test]
    fn test_push_creates_and_extends_list() {
        let mut instance = Instance::new("dc:Edge");
        instance.push("waypoint", "a");
        instance.push("waypoint", "b");

        let items = instance.get("waypoint").and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_str(), Some("b"));
    }

    #[test]
    fn test_push_onto_single_value_converts_to_list() {
        let mut instance = Instance::new("dc:Edge");
        instance.set("waypoint", "a");
        instance.push("waypoint", "b");

        assert_eq!(instance.get("waypoint").unwrap().items().len(), 2);
    }

    #[test]
    fn test_unset_removes_property() {
        let mut instance = Instance::new("dmn:Decision");
        instance.set("name", "x");
        assert!(instance.unset("name").is_some());
        assert!(!instance.is_set("name"));
    }

    #[test]
    fn test_reference_points_to_same_instance() {
        let target = ObjectRef::new(Instance::new("dmn:InputData"));
        let reference = Reference::to(&target);

        assert!(reference.target().unwrap().ptr_eq(&target));
        assert!(reference.is_resolved());
    }

    #[test]
    fn test_reference_does_not_keep_target_alive() {
        let target = ObjectRef::new(Instance::new("dmn:InputData"));
        let reference = Reference::to(&target);
        drop(target);

        assert!(reference.target().is_none());
    }
}

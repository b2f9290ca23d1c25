use serde_json::{Map, Value as Json};

use crate::{
    instance::ObjectRef,
    registry::Registry,
    value::{Reference, Value},
};

pub(crate) fn snapshot(registry: &Registry, object: &ObjectRef) -> Json {
    let instance = object.borrow();
    let mut map = Map::new();
    map.insert("$type".to_string(), Json::from(instance.type_name()));
    for (name, value) in instance.properties() {
        map.insert(name.to_string(), value_snapshot(registry, value));
    }

    if !instance.extension_attributes().is_empty() {
        let attributes: Map<String, Json> = instance
            .extension_attributes()
            .iter()
            .map(|attribute| (attribute.name().to_string(), Json::from(attribute.value())))
            .collect();
        map.insert("$attrs".to_string(), Json::Object(attributes));
    }
    if !instance.extension_elements().is_empty() {
        let elements = instance
            .extension_elements()
            .iter()
            .map(|element| Json::from(element.markup()))
            .collect();
        map.insert("$extensions".to_string(), Json::Array(elements));
    }

    Json::Object(map)
}

fn value_snapshot(registry: &Registry, value: &Value) -> Json {
    match value {
        Value::Scalar(scalar) => scalar.to_json(),
        Value::Object(object) => snapshot(registry, object),
        Value::Reference(Reference::Unresolved(id)) => single("$unresolved", Json::from(id.as_str())),
        Value::Reference(reference) => {
            let id = reference
                .target()
                .and_then(|target| registry.identity_of(&target.borrow()));
            single("$ref", id.map(Json::from).unwrap_or(Json::Null))
        }
        Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| value_snapshot(registry, item))
                .collect(),
        ),
        Value::Extension(extension) => single("$extension", Json::from(extension.markup())),
    }
}

fn single(key: &str, value: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Json::Object(map)
}

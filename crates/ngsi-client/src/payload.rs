//! NGSI request construction
//!
//! Builds the path and JSON body of every context broker request without
//! touching the network. [`crate::NgsiClient`] sends what these return.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::encode::encode_uri;
use crate::error::Result;
use crate::types::{Attribute, Dialect, EntityRef};

pub const UPDATE_CONTEXT_V1: &str = "/v1/updateContext";
pub const QUERY_CONTEXT_V1: &str = "/v1/queryContext";
pub const DISCOVER_CONTEXT_V1: &str = "/v1/registry/discoverContextAvailability";
pub const UPDATE_V2: &str = "/v2/op/update";
pub const QUERY_V2: &str = "/v2/op/query";

/// Which client operation produced a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Update,
    Query,
    Discover,
}

/// A fully built context broker request, minus connection details
#[derive(Debug, Clone, PartialEq)]
pub struct NgsiRequest {
    pub operation: Operation,
    pub dialect: Dialect,
    pub path: &'static str,
    pub body: Value,
}

// =============================================================================
// NGSI v1 bodies
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContextBody<'a> {
    context_elements: [ContextElement<'a>; 1],
    update_action: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextElement<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    entity_type: Option<&'a str>,
    id: &'a str,
    is_pattern: &'static str,
    attributes: &'a [Attribute],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityPattern<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    entity_type: Option<&'a str>,
    id: &'a str,
    is_pattern: &'static str,
}

impl<'a> EntityPattern<'a> {
    fn exact(entity: &'a EntityRef) -> Self {
        Self {
            entity_type: entity.entity_type.as_deref(),
            id: &entity.id,
            is_pattern: "false",
        }
    }
}

/// Shared by queryContext and discoverContextAvailability
#[derive(Serialize)]
struct ContextQueryBody<'a> {
    entities: [EntityPattern<'a>; 1],
    attributes: &'a [String],
}

/// `POST /v1/updateContext`; attributes are sent exactly as given
pub fn update_v1(entity: &EntityRef, attributes: &[Attribute]) -> Result<NgsiRequest> {
    let body = UpdateContextBody {
        context_elements: [ContextElement {
            entity_type: entity.entity_type.as_deref(),
            id: &entity.id,
            is_pattern: "false",
            attributes,
        }],
        update_action: "UPDATE",
    };

    Ok(NgsiRequest {
        operation: Operation::Update,
        dialect: Dialect::V1,
        path: UPDATE_CONTEXT_V1,
        body: serde_json::to_value(body)?,
    })
}

/// `POST /v1/queryContext`
pub fn query_v1(entity: &EntityRef, attributes: &[String]) -> Result<NgsiRequest> {
    let body = ContextQueryBody {
        entities: [EntityPattern::exact(entity)],
        attributes,
    };

    Ok(NgsiRequest {
        operation: Operation::Query,
        dialect: Dialect::V1,
        path: QUERY_CONTEXT_V1,
        body: serde_json::to_value(body)?,
    })
}

/// `POST /v1/registry/discoverContextAvailability`
///
/// There is no v2 counterpart, so this is v1 whatever dialect is current.
pub fn discover(entity: &EntityRef, attributes: &[String]) -> Result<NgsiRequest> {
    let body = ContextQueryBody {
        entities: [EntityPattern::exact(entity)],
        attributes,
    };

    Ok(NgsiRequest {
        operation: Operation::Discover,
        dialect: Dialect::V1,
        path: DISCOVER_CONTEXT_V1,
        body: serde_json::to_value(body)?,
    })
}

// =============================================================================
// NGSI v2 bodies
// =============================================================================

/// Attributes the v2 encoder will write: those with a name and a type
///
/// Everything else is dropped without error. Applying the filter to its own
/// output returns the same collection.
pub fn writable_attributes(attributes: &[Attribute]) -> Vec<Attribute> {
    attributes
        .iter()
        .filter(|attr| attr.is_writable())
        .cloned()
        .collect()
}

fn entity_object(entity: &EntityRef) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(entity.id.clone()));
    if let Some(entity_type) = &entity.entity_type {
        object.insert("type".to_string(), Value::String(entity_type.clone()));
    }
    object
}

/// `POST /v2/op/update`; each writable attribute becomes a key on the entity
pub fn update_v2(entity: &EntityRef, attributes: &[Attribute]) -> Result<NgsiRequest> {
    let mut object = entity_object(entity);

    for attr in writable_attributes(attributes) {
        let mut value = Map::new();
        if let Some(attr_value) = attr.value {
            value.insert("value".to_string(), attr_value);
        }
        if let Some(attr_type) = attr.attr_type {
            value.insert("type".to_string(), Value::String(attr_type));
        }
        if let Some(metadata) = attr.metadata {
            value.insert("metadata".to_string(), metadata);
        }
        object.insert(encode_uri(&attr.name), Value::Object(value));
    }

    Ok(NgsiRequest {
        operation: Operation::Update,
        dialect: Dialect::V2,
        path: UPDATE_V2,
        body: json!({
            "actionType": "update",
            "entities": [Value::Object(object)],
        }),
    })
}

/// `POST /v2/op/query`; `attrs` is only sent when names were requested
pub fn query_v2(entity: &EntityRef, attributes: &[String]) -> Result<NgsiRequest> {
    let mut body = Map::new();
    body.insert(
        "entities".to_string(),
        Value::Array(vec![Value::Object(entity_object(entity))]),
    );

    if !attributes.is_empty() {
        let attrs = attributes
            .iter()
            .map(|name| Value::String(encode_uri(name)))
            .collect();
        body.insert("attrs".to_string(), Value::Array(attrs));
    }

    Ok(NgsiRequest {
        operation: Operation::Query,
        dialect: Dialect::V2,
        path: QUERY_V2,
        body: Value::Object(body),
    })
}

/// Build an update in the given dialect
pub fn update(dialect: Dialect, entity: &EntityRef, attributes: &[Attribute]) -> Result<NgsiRequest> {
    match dialect {
        Dialect::V1 => update_v1(entity, attributes),
        Dialect::V2 => update_v2(entity, attributes),
    }
}

/// Build a query in the given dialect
pub fn query(dialect: Dialect, entity: &EntityRef, attributes: &[String]) -> Result<NgsiRequest> {
    match dialect {
        Dialect::V1 => query_v1(entity, attributes),
        Dialect::V2 => query_v2(entity, attributes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp() -> Attribute {
        Attribute::new("temp", "Number", 21)
    }

    #[test]
    fn test_update_v1_body() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![temp()];

        let request = update_v1(&entity, &attributes).unwrap();
        assert_eq!(request.path, "/v1/updateContext");
        assert_eq!(request.dialect, Dialect::V1);
        assert_eq!(
            request.body,
            json!({
                "contextElements": [{
                    "type": "Light",
                    "id": "Light:1",
                    "isPattern": "false",
                    "attributes": [{"name": "temp", "type": "Number", "value": 21}]
                }],
                "updateAction": "UPDATE"
            })
        );
    }

    #[test]
    fn test_update_v1_passes_attributes_unmodified() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![
            temp(),
            Attribute::untyped("untyped", "x"),
            Attribute::new("", "Text", "no name").with_metadata(json!({"unit": "C"})),
        ];

        let request = update_v1(&entity, &attributes).unwrap();
        assert_eq!(
            request.body["contextElements"][0]["attributes"],
            serde_json::to_value(&attributes).unwrap()
        );
    }

    #[test]
    fn test_update_v1_without_type_omits_type() {
        let request = update_v1(&EntityRef::new("Light:1"), &[]).unwrap();
        let element = request.body["contextElements"][0].as_object().unwrap();
        assert!(!element.contains_key("type"));
        assert_eq!(element["attributes"], json!([]));
    }

    #[test]
    fn test_update_v2_body() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![temp().with_metadata(json!({}))];

        let request = update_v2(&entity, &attributes).unwrap();
        assert_eq!(request.path, "/v2/op/update");
        assert_eq!(
            request.body,
            json!({
                "actionType": "update",
                "entities": [{
                    "id": "Light:1",
                    "type": "Light",
                    "temp": {"value": 21, "type": "Number", "metadata": {}}
                }]
            })
        );
    }

    #[test]
    fn test_update_v2_skips_attributes_without_name_or_type() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![
            temp(),
            Attribute::untyped("pressure", 3),
            Attribute::new("", "Number", 4),
            Attribute::new("humidity", "", 5),
        ];

        let request = update_v2(&entity, &attributes).unwrap();
        let object = request.body["entities"][0].as_object().unwrap();
        let mut keys: Vec<_> = object.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "temp", "type"]);
    }

    #[test]
    fn test_update_v2_encodes_attribute_names() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![Attribute::new("room temp", "Number", 18)];

        let request = update_v2(&entity, &attributes).unwrap();
        assert_eq!(
            request.body["entities"][0]["room%20temp"],
            json!({"value": 18, "type": "Number"})
        );
    }

    #[test]
    fn test_update_v2_omits_missing_value() {
        let entity = EntityRef::typed("Light:1", "Light");
        let attributes = vec![
            Attribute::valueless("status", "Text"),
            Attribute::new("reset", "Boolean", Value::Null),
        ];

        let request = update_v2(&entity, &attributes).unwrap();
        assert_eq!(request.body["entities"][0]["status"], json!({"type": "Text"}));
        assert_eq!(
            request.body["entities"][0]["reset"],
            json!({"value": null, "type": "Boolean"})
        );
    }

    #[test]
    fn test_update_v1_omits_missing_value() {
        let request = update_v1(&EntityRef::new("Light:1"), &[Attribute::valueless("status", "Text")]).unwrap();
        assert_eq!(
            request.body["contextElements"][0]["attributes"],
            json!([{"name": "status", "type": "Text"}])
        );
    }

    #[test]
    fn test_writable_attributes_is_idempotent() {
        let attributes = vec![
            temp(),
            Attribute::untyped("pressure", 3),
            Attribute::new("", "Number", 4),
        ];

        let once = writable_attributes(&attributes);
        let twice = writable_attributes(&once);
        assert_eq!(once, vec![temp()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_query_v1_body() {
        let entity = EntityRef::typed("Light:1", "Light");
        let names = vec!["temp".to_string(), "luminosity".to_string()];

        let request = query_v1(&entity, &names).unwrap();
        assert_eq!(request.path, "/v1/queryContext");
        assert_eq!(
            request.body,
            json!({
                "entities": [{"type": "Light", "id": "Light:1", "isPattern": "false"}],
                "attributes": ["temp", "luminosity"]
            })
        );
    }

    #[test]
    fn test_query_v2_empty_attributes_omits_attrs() {
        let request = query_v2(&EntityRef::typed("Light:1", "Light"), &[]).unwrap();
        assert_eq!(request.path, "/v2/op/query");
        assert_eq!(
            request.body,
            json!({"entities": [{"id": "Light:1", "type": "Light"}]})
        );
    }

    #[test]
    fn test_query_v2_encodes_attrs_in_order() {
        let names = vec!["z last".to_string(), "a".to_string(), "ñ".to_string()];
        let request = query_v2(&EntityRef::new("Light:1"), &names).unwrap();
        assert_eq!(
            request.body,
            json!({
                "entities": [{"id": "Light:1"}],
                "attrs": ["z%20last", "a", "%C3%B1"]
            })
        );
    }

    #[test]
    fn test_discover_is_always_v1() {
        let names = vec!["temp".to_string()];
        let request = discover(&EntityRef::typed("Light:1", "Light"), &names).unwrap();
        assert_eq!(request.path, "/v1/registry/discoverContextAvailability");
        assert_eq!(request.dialect, Dialect::V1);
        assert_eq!(request.operation, Operation::Discover);
        assert_eq!(
            request.body,
            json!({
                "entities": [{"type": "Light", "id": "Light:1", "isPattern": "false"}],
                "attributes": ["temp"]
            })
        );
    }

    #[test]
    fn test_dialect_dispatch() {
        let entity = EntityRef::new("Light:1");
        assert_eq!(update(Dialect::V1, &entity, &[]).unwrap().path, UPDATE_CONTEXT_V1);
        assert_eq!(update(Dialect::V2, &entity, &[]).unwrap().path, UPDATE_V2);
        assert_eq!(query(Dialect::V1, &entity, &[]).unwrap().path, QUERY_CONTEXT_V1);
        assert_eq!(query(Dialect::V2, &entity, &[]).unwrap().path, QUERY_V2);
    }
}

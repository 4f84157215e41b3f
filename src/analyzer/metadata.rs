use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::MetaFields;

/// Canonical analysis result for one component.
///
/// A `None` category was disabled through `metaFields` and is omitted from
/// serialized output, as opposed to `Some(vec![])` which means "computed,
/// nothing found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<PropMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<SlotMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed: Option<Vec<ExposedMeta>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMeta {
    pub name: String,
    /// Shape of the bindings the slot passes to its content.
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub name: String,
    /// Payload type.
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

const UNKNOWN_TYPE: &str = "unknown";

/// Convert raw analyzer output into [`ComponentMetadata`], keeping only the
/// selected categories.
///
/// Each category may arrive as a list of objects carrying `name`, or as an
/// object keyed by member name whose values are either objects or a bare
/// type string.
pub fn normalize(raw: &Value, fields: MetaFields) -> Result<ComponentMetadata, String> {
    let root = raw
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", kind_of(raw)))?;

    let props = if fields.props {
        let mut props: Vec<PropMeta> = members(root, "props")?
            .into_iter()
            .filter(|(_, obj)| !flag(obj, "global"))
            .map(|(name, obj)| PropMeta {
                ty: type_text(&obj, &["type", "schema"]),
                required: flag(&obj, "required"),
                default: obj.get("default").and_then(value_text),
                description: obj
                    .get("description")
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                name,
            })
            .collect();
        // required first, then alphabetical
        props.sort_by(|a, b| b.required.cmp(&a.required).then_with(|| a.name.cmp(&b.name)));
        Some(props)
    } else {
        None
    };

    let slots = if fields.slots {
        Some(
            members(root, "slots")?
                .into_iter()
                .map(|(name, obj)| SlotMeta {
                    ty: type_text(&obj, &["type", "schema"]),
                    name,
                })
                .collect(),
        )
    } else {
        None
    };

    let events = if fields.events {
        Some(
            members(root, "events")?
                .into_iter()
                .map(|(name, obj)| EventMeta {
                    ty: type_text(&obj, &["type", "signature", "schema"]),
                    name,
                })
                .collect(),
        )
    } else {
        None
    };

    let exposed = if fields.exposed {
        Some(
            members(root, "exposed")?
                .into_iter()
                .map(|(name, obj)| ExposedMeta {
                    ty: type_text(&obj, &["type", "schema"]),
                    name,
                })
                .collect(),
        )
    } else {
        None
    };

    Ok(ComponentMetadata {
        props,
        slots,
        events,
        exposed,
    })
}

fn members(root: &Map<String, Value>, key: &str) -> Result<Vec<(String, Map<String, Value>)>, String> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let obj = item
                    .as_object()
                    .ok_or_else(|| format!("`{key}` entries must be objects, got {}", kind_of(item)))?;
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| format!("`{key}` entry without a name"))?;
                Ok((name.to_string(), obj.clone()))
            })
            .collect(),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(name, value)| {
                let obj = match value {
                    Value::Object(obj) => obj.clone(),
                    other => {
                        let mut obj = Map::new();
                        obj.insert("type".to_string(), other.clone());
                        obj
                    }
                };
                (name.clone(), obj)
            })
            .collect()),
        Some(other) => Err(format!("`{key}` must be a list or an object, got {}", kind_of(other))),
    }
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn type_text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(value_text))
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

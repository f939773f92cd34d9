//! Strict JSON schemas for structured-output requests.
//!
//! Schemas are generated from the typed response model with `schemars` and
//! rewritten into the strict form OpenAI-compatible endpoints accept:
//! 1. `additionalProperties: false` on every object schema
//! 2. every property listed in `required`, nullable ones included
//! 3. no `$ref`s (definitions are inlined)

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// Strict schema for `T`.
pub fn strict_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_default();

    close_object_schemas(&mut value);
    inline_refs(&mut value);

    if let Value::Object(map) = &mut value {
        map.remove("definitions");
        map.remove("$schema");
    }

    value
}

fn close_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all_keys));
                }
            }

            for (_, v) in map.iter_mut() {
                close_object_schemas(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                close_object_schemas(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs_with(value, &defs);
    }
}

fn inline_refs_with(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(def) = target {
                *value = def;
                inline_refs_with(value, definitions);
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs_with(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_with(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Citation {
        file: String,
        phrase: Option<String>,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Answer {
        label: String,
        citations: Vec<Citation>,
    }

    fn contains_key(value: &Value, key: &str) -> bool {
        match value {
            Value::Object(map) => {
                map.contains_key(key) || map.values().any(|v| contains_key(v, key))
            }
            Value::Array(arr) => arr.iter().any(|v| contains_key(v, key)),
            _ => false,
        }
    }

    #[test]
    fn test_strict_schema_has_no_refs() {
        let schema = strict_schema::<Answer>();

        assert!(!contains_key(&schema, "$ref"));
        assert!(!contains_key(&schema, "definitions"));
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn test_strict_schema_closes_objects() {
        let schema = strict_schema::<Answer>();
        assert_eq!(schema["additionalProperties"], false);

        let citation = &schema["properties"]["citations"]["items"];
        assert_eq!(citation["additionalProperties"], false);

        let required: Vec<&str> = citation["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"file"));
        assert!(required.contains(&"phrase"));
    }
}

//! 工具参数 Schema 清洗
//!
//! MCP 服务端给出的 inputSchema 是完整的 JSON Schema，Gemini 的 functionDeclarations 只接受其子集；
//! 这里在任意嵌套层级删除 Planner 不认识的元数据键，其余结构原样保留。

use serde_json::{Map, Value};

/// Planner 不支持的 Schema 键，出现在任意层级都会被删除
pub const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "$id",
    "$defs",
    "definitions",
    "$ref",
    "examples",
];

pub fn is_unsupported_key(key: &str) -> bool {
    UNSUPPORTED_SCHEMA_KEYS.contains(&key)
}

/// 递归清洗：对象删除黑名单键并递归其值，数组逐项递归，标量原样返回
pub fn clean_schema(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !is_unsupported_key(k))
                .map(|(k, v)| (k.clone(), clean_schema(v)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(clean_schema).collect()),
        other => other.clone(),
    }
}

/// 原地版本，结果与 clean_schema 相同；用于已拥有所有权的大 Schema，避免整棵树复制
pub fn strip_schema_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !is_unsupported_key(k));
            map.values_mut().for_each(strip_schema_in_place);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_schema_in_place),
        _ => {}
    }
}

/// 服务端未提供 inputSchema 时使用的空参数 Schema
pub fn empty_object_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::{schema_for, JsonSchema};
    use serde_json::json;

    fn contains_unsupported_key(value: &Value) -> bool {
        match value {
            Value::Object(map) => map
                .iter()
                .any(|(k, v)| is_unsupported_key(k) || contains_unsupported_key(v)),
            Value::Array(items) => items.iter().any(contains_unsupported_key),
            _ => false,
        }
    }

    fn sample_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "navigate",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "url": {"type": "string", "description": "The URL", "examples": ["https://example.com"]},
                "options": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "properties": {"wait": {"$ref": "#/definitions/Wait"}}
                },
                "steps": {
                    "type": "array",
                    "items": [{"$id": "step", "type": "string"}, 3, null, true]
                }
            },
            "required": ["url"],
            "definitions": {"Wait": {"type": "string"}},
            "$defs": {"Other": {"type": "number"}}
        })
    }

    #[test]
    fn test_clean_removes_keys_at_every_depth() {
        let cleaned = clean_schema(&sample_schema());
        assert!(!contains_unsupported_key(&cleaned));
        assert_eq!(
            cleaned,
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL"},
                    "options": {
                        "type": "object",
                        "properties": {"wait": {}}
                    },
                    "steps": {
                        "type": "array",
                        "items": [{"type": "string"}, 3, null, true]
                    }
                },
                "required": ["url"]
            })
        );
    }

    #[test]
    fn test_clean_keeps_other_keys_in_order() {
        let input = json!({"b": 1, "title": "t", "a": {"z": [], "enum": ["x"]}});
        let cleaned = clean_schema(&input);
        assert_eq!(cleaned, input);
        let keys: Vec<&String> = cleaned.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "title", "a"]);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_schema(&sample_schema());
        assert_eq!(clean_schema(&once), once);
    }

    #[test]
    fn test_scalars_pass_through() {
        for v in [json!(null), json!(true), json!(42), json!("$ref"), json!(1.5)] {
            assert_eq!(clean_schema(&v), v);
        }
    }

    #[test]
    fn test_keys_only_removed_as_keys_not_values() {
        let input = json!({"enum": ["$schema", "examples"], "const": "$ref"});
        assert_eq!(clean_schema(&input), input);
    }

    #[test]
    fn test_in_place_matches_clean() {
        let mut owned = sample_schema();
        strip_schema_in_place(&mut owned);
        assert_eq!(owned, clean_schema(&sample_schema()));
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Inner {
        depth: u32,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Outer {
        name: String,
        inner: Inner,
        tags: Vec<Inner>,
    }

    #[test]
    fn test_clean_generated_schema() {
        let raw = serde_json::to_value(schema_for!(Outer)).unwrap();
        assert!(contains_unsupported_key(&raw));
        let cleaned = clean_schema(&raw);
        assert!(!contains_unsupported_key(&cleaned));
        assert_eq!(cleaned["title"], json!("Outer"));
        assert!(cleaned["properties"]["name"].is_object());
    }
}

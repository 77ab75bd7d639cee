//! JSON schema of project documents.
//!
//! Checked before deserialization so a malformed document is rejected with a
//! message pointing at the offending value rather than a serde error deep in
//! a tagged enum.

use serde_json::{Value, json};

use crate::Result;

const NODE_KINDS: [&str; 4] = ["action", "checker", "counter", "container"];
const ACTION_TYPES: [&str; 5] = ["delayed", "confirmed_delayed", "region_switch", "counter", "log"];
const CHECKER_TYPES: [&str; 3] = ["region", "counter", "logical"];

/// Schema every project document must satisfy.
pub fn schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["name"],
        "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" },
            "nodes": { "type": "array", "items": { "$ref": "#/$defs/node" } }
        },
        "$defs": {
            "header": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "id": { "type": "string" },
                    "name": { "type": "string" },
                    "enabled": { "type": "boolean" }
                }
            },
            "region": {
                "type": "object",
                "required": ["x", "y", "width", "height"],
                "properties": {
                    "x": { "type": "integer" },
                    "y": { "type": "integer" },
                    "width": { "type": "integer", "minimum": 0 },
                    "height": { "type": "integer", "minimum": 0 }
                }
            },
            "pattern": {
                "type": "object",
                "required": ["image_path"],
                "properties": {
                    "image_path": { "type": "string" },
                    "similarity": { "type": "number" },
                    "fallback_path": { "type": "string" }
                }
            },
            "actions": { "type": "array", "items": { "$ref": "#/$defs/action" } },
            "node": {
                "$ref": "#/$defs/header",
                "required": ["kind"],
                "properties": {
                    "kind": { "enum": NODE_KINDS },
                    "children": { "type": "array", "items": { "$ref": "#/$defs/node" } }
                },
                "allOf": [
                    { "if": { "properties": { "kind": { "const": "action" } } }, "then": { "$ref": "#/$defs/action" } },
                    { "if": { "properties": { "kind": { "const": "checker" } } }, "then": { "$ref": "#/$defs/checker" } },
                    { "if": { "properties": { "kind": { "const": "counter" } } }, "then": { "required": ["counter"] } }
                ]
            },
            "action": {
                "$ref": "#/$defs/header",
                "required": ["type"],
                "properties": {
                    "type": { "enum": ACTION_TYPES },
                    "delay_ms": { "type": "integer", "minimum": 0 },
                    "actions": { "$ref": "#/$defs/actions" },
                    "guard": { "$ref": "#/$defs/checker" },
                    "region": { "$ref": "#/$defs/region" },
                    "policy": { "enum": ["find_first", "find_best"] },
                    "targets": {
                        "type": "array",
                        "items": {
                            "allOf": [{ "$ref": "#/$defs/header" }, { "$ref": "#/$defs/pattern" }],
                            "properties": { "actions": { "$ref": "#/$defs/actions" } }
                        }
                    },
                    "default_actions": { "$ref": "#/$defs/actions" },
                    "operation": { "enum": ["increment", "decrement", "set", "reset"] },
                    "message": { "type": "string" }
                },
                "allOf": [
                    { "if": { "properties": { "type": { "enum": ["delayed", "confirmed_delayed"] } } }, "then": { "required": ["delay_ms"] } },
                    { "if": { "properties": { "type": { "const": "region_switch" } } }, "then": { "required": ["region"] } },
                    { "if": { "properties": { "type": { "const": "counter" } } }, "then": { "required": ["counter"] } },
                    { "if": { "properties": { "type": { "const": "log" } } }, "then": { "required": ["message"] } }
                ]
            },
            "checker": {
                "$ref": "#/$defs/header",
                "required": ["type"],
                "properties": {
                    "type": { "enum": CHECKER_TYPES },
                    "region": { "$ref": "#/$defs/region" },
                    "operator": { "enum": ["eq", "ne", "gt", "lt", "ge", "le", "and", "or"] },
                    "negate": { "type": "boolean" },
                    "conditions": { "type": "array", "items": { "$ref": "#/$defs/checker" } }
                },
                "allOf": [
                    { "if": { "properties": { "type": { "const": "region" } } }, "then": { "$ref": "#/$defs/pattern", "required": ["region"] } },
                    { "if": { "properties": { "type": { "const": "counter" } } }, "then": { "required": ["counter", "operator", "value"] } }
                ]
            }
        }
    })
}

/// Check `document` against [`schema`].
pub fn validate(document: &Value) -> Result<()> {
    let validator = jsonschema::validator_for(&schema())?;
    validator.validate(document)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CueflowError;

    #[test]
    fn accepts_a_complete_document() {
        let document = json!({
            "name": "Stream",
            "nodes": [
                { "kind": "counter", "name": "Deaths", "counter": "deaths", "initial": 0 },
                {
                    "kind": "action", "type": "region_switch", "name": "Scene",
                    "region": { "x": 0, "y": 0, "width": 320, "height": 180 },
                    "policy": "find_best",
                    "targets": [{ "name": "Lobby", "image_path": "lobby.png", "actions": [] }],
                    "default_actions": [{ "type": "counter", "name": "Bump", "counter": "deaths" }]
                },
                {
                    "kind": "action", "type": "confirmed_delayed", "name": "Confirm", "delay_ms": 500,
                    "guard": { "type": "counter", "name": "Alive", "counter": "deaths", "operator": "lt", "value": 3 },
                    "actions": [{ "type": "log", "name": "Say", "message": "still alive" }]
                },
                { "kind": "container", "name": "Empty", "children": [] }
            ]
        });

        validate(&document).unwrap();
    }

    #[test]
    fn rejects_unknown_types_and_missing_fields() {
        let unknown = json!({ "name": "p", "nodes": [{ "kind": "action", "type": "teleport", "name": "x" }] });
        assert!(matches!(validate(&unknown), Err(CueflowError::Convert(_))));

        let no_delay = json!({ "name": "p", "nodes": [{ "kind": "action", "type": "delayed", "name": "x", "actions": [] }] });
        assert!(validate(&no_delay).is_err());

        let bad_guard = json!({
            "name": "p",
            "nodes": [{ "kind": "action", "type": "confirmed_delayed", "name": "x", "delay_ms": 1, "guard": { "type": "region", "name": "g" } }]
        });
        assert!(validate(&bad_guard).is_err());

        let nameless = json!({ "name": "p", "nodes": [{ "kind": "counter", "counter": "c" }] });
        assert!(validate(&nameless).is_err());
    }
}

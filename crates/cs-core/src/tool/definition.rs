//! Tool declarations and schema helpers

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

pub use crate::llm::ToolDefinition;

use super::Tool;

/// Everything a tool declares about itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<JsonValue>,
}

impl ToolDeclaration {
    /// Capture the declaration of a tool
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
            output_schema: tool.output_schema(),
        }
    }

    /// The part of the declaration sent to the model
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description, self.input_schema.clone())
    }
}

/// Helper functions for creating tool schemas
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Create an object schema with descriptions for properties
    ///
    /// # Arguments
    /// * `properties` - A list of tuples (name, type, description, required)
    ///
    /// # Example
    /// ```ignore
    /// let schema = SchemaBuilder::object_schema(vec![
    ///     ("query", "string", "Natural-language question", true),
    ///     ("limit", "integer", "Maximum records", false),
    /// ]);
    /// ```
    pub fn object_schema(properties: Vec<(&str, &str, &str, bool)>) -> JsonValue {
        let props: serde_json::Map<String, JsonValue> = properties
            .iter()
            .map(|(name, type_str, desc, _)| {
                (name.to_string(), json!({"type": type_str, "description": desc}))
            })
            .collect();

        let required: Vec<&str> = properties
            .iter()
            .filter(|(_, _, _, required)| *required)
            .map(|(name, _, _, _)| *name)
            .collect();

        json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }

    /// Create a string enum schema
    pub fn string_enum(description: &str, enum_values: &[&str]) -> JsonValue {
        json!({
            "type": "string",
            "description": description,
            "enum": enum_values
        })
    }

    /// Names listed as required by an object schema
    pub fn required_fields(schema: &JsonValue) -> Vec<&str> {
        schema
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|fields| fields.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_schema_required() {
        let schema = SchemaBuilder::object_schema(vec![
            ("query", "string", "question", true),
            ("user_application", "string", "application name", true),
            ("limit", "integer", "max records", false),
        ]);
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(
            SchemaBuilder::required_fields(&schema),
            vec!["query", "user_application"]
        );
    }

    #[test]
    fn test_string_enum() {
        let schema = SchemaBuilder::string_enum("severity", &["INFO", "WARNING", "ERROR"]);
        assert_eq!(schema["enum"][2], "ERROR");
    }
}

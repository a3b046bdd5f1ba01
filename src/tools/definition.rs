use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// What the model sees of a tool: name, description and a JSON-schema
/// object describing its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self { name: name.into(), description: description.into(), input_schema }
    }

    /// Convert to the SDK's `FunctionObject`.
    pub fn function_object(&self) -> FunctionObject {
        FunctionObject {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            parameters: Some(self.input_schema.clone()),
            strict: Some(false),
        }
    }

    /// `ChatCompletionTool` form for the request's `tools` vector.
    pub fn as_chat_tool(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: self.function_object(),
        }
    }

    /// Names listed under the schema's `required` key.
    pub fn required_parameters(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Builder for a tool's `{"type": "object", ...}` input schema.
#[derive(Debug, Clone, Default)]
pub struct ToolParametersBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
    additional_properties: Option<bool>,
}

impl ToolParametersBuilder {
    pub fn new_object() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, mut schema: Map<String, Value>, description: Option<&str>) -> Self {
        if let Some(d) = description {
            schema.insert("description".into(), Value::String(d.to_string()));
        }
        self.properties.insert(name.to_string(), Value::Object(schema));
        self
    }

    pub fn add_string(self, name: &str, description: Option<&str>) -> Self {
        let mut schema = Map::new();
        schema.insert("type".into(), json!("string"));
        self.property(name, schema, description)
    }

    pub fn add_integer(self, name: &str, description: Option<&str>, min: Option<i64>, max: Option<i64>) -> Self {
        let mut schema = Map::new();
        schema.insert("type".into(), json!("integer"));
        if let Some(m) = min {
            schema.insert("minimum".into(), json!(m));
        }
        if let Some(m) = max {
            schema.insert("maximum".into(), json!(m));
        }
        self.property(name, schema, description)
    }

    pub fn required(mut self, name: &str) -> Self {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn additional_properties(mut self, allowed: bool) -> Self {
        self.additional_properties = Some(allowed);
        self
    }

    pub fn build(self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!("object"));
        obj.insert("properties".into(), Value::Object(self.properties));
        obj.insert("required".into(), json!(self.required));
        if let Some(a) = self.additional_properties {
            obj.insert("additionalProperties".into(), json!(a));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_emits_object_schema() {
        let schema = ToolParametersBuilder::new_object()
            .add_string("query", Some("What to search for"))
            .add_integer("lesson_number", None, Some(0), None)
            .required("query")
            .required("query")
            .build();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["lesson_number"]["minimum"], 0);
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn chat_tool_conversion_keeps_name() {
        let def = ToolDefinition::new("echo", "Echo input", ToolParametersBuilder::new_object().build());
        let chat_tool = def.as_chat_tool();
        assert_eq!(chat_tool.function.name, "echo");
        assert!(def.required_parameters().is_empty());
    }
}

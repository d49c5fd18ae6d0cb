//! Tool domain entities

use super::verbs::WriteVerb;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameter specification for a tool, normalised from its JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name as the server spells it
    pub name: String,
    /// Parameter description
    #[serde(default)]
    pub description: String,
    /// JSON Schema type (`string`, `number`, `array`, ...)
    pub param_type: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Allowed values when the schema declares an `enum`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            param_type: param_type.into(),
            required,
            enum_values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// A remote operation the agent can invoke.
///
/// Immutable once captured in a [`ToolCatalog`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique, stable name (e.g. `create_invoice`)
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Normalised parameters, in schema order
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    /// The raw `inputSchema` as received
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Build a descriptor from a JSON Schema object.
    ///
    /// Reads `properties`, `required` and per-property `type`, `description`
    /// and `enum`. A property without a `type` is treated as `string`; a
    /// union type (`["string", "null"]`) keeps its first non-null member.
    pub fn from_input_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        let required: Vec<&str> = input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let mut parameters = Vec::new();
        if let Some(properties) = input_schema.get("properties").and_then(|p| p.as_object()) {
            for (param_name, prop) in properties {
                let param_type = match prop.get("type") {
                    Some(Value::String(t)) => t.clone(),
                    Some(Value::Array(types)) => types
                        .iter()
                        .filter_map(|t| t.as_str())
                        .find(|t| *t != "null")
                        .unwrap_or("string")
                        .to_string(),
                    _ => "string".to_string(),
                };
                let enum_values = prop
                    .get("enum")
                    .and_then(|e| e.as_array())
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| match v {
                                Value::String(s) => Some(s.clone()),
                                Value::Null => None,
                                other => Some(other.to_string()),
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                parameters.push(ToolParameter {
                    name: param_name.clone(),
                    description: prop
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    param_type,
                    required: required.contains(&param_name.as_str()),
                    enum_values,
                });
            }
        }

        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            input_schema,
        }
    }

    /// The mutating verb of this tool, if any.
    pub fn write_verb(&self) -> Option<WriteVerb> {
        WriteVerb::from_tool_name(&self.name)
    }

    pub fn is_write(&self) -> bool {
        self.write_verb().is_some()
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

/// Snapshot of the tools currently known for one server.
///
/// A catalog is never patched in place: discovery builds a new one and the
/// holder swaps it in, so readers always see a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
    fetched_at: Option<DateTime<Utc>>,
}

impl ToolCatalog {
    /// An empty catalog (nothing discovered yet).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from discovered descriptors. On duplicate names the
    /// first descriptor wins.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut tools = BTreeMap::new();
        for descriptor in descriptors {
            tools.entry(descriptor.name.clone()).or_insert(descriptor);
        }
        Self {
            tools,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All descriptors, ordered by name.
    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn write_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().filter(|t| t.is_write())
    }

    pub fn read_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().filter(|t| !t.is_write())
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

//! Response schema handling for structured completions.
//!
//! Callers describe the output they want either as a raw JSON Schema object or
//! as a Rust type that can describe itself (`JsonSchema`) and be parsed back
//! (`DeserializeOwned`). Both resolve to a plain JSON Schema for the request;
//! only the typed forms are parsed on the way back.

use super::types::ChatCompletion;
use crate::error::{ProviderError, ProviderResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// A type that can describe its JSON shape and be rebuilt from model output.
pub trait SchemaDescriptor: DeserializeOwned + Send + Sync + 'static {
    /// The JSON Schema for this type.
    fn json_schema() -> Value;
}

impl<T> SchemaDescriptor for T
where
    T: schemars::JsonSchema + DeserializeOwned + Send + Sync + 'static,
{
    fn json_schema() -> Value {
        schemars::schema_for!(T).to_value()
    }
}

/// The shape a caller asks the model to produce.
#[derive(Debug, Clone)]
pub enum SchemaInput<T> {
    /// A JSON Schema object; the completion is returned unparsed.
    Raw(Value),
    /// A descriptor type; the completion is parsed into `T`.
    Type(PhantomData<T>),
    /// An instance of a descriptor type; parsed like `Type`.
    Instance(T),
}

impl SchemaInput<Value> {
    /// Raw JSON Schema input.
    pub fn raw(schema: Value) -> Self {
        Self::Raw(schema)
    }
}

impl<T: SchemaDescriptor> SchemaInput<T> {
    /// Descriptor type input.
    pub fn of() -> Self {
        Self::Type(PhantomData)
    }

    /// Descriptor instance input.
    pub fn instance(value: T) -> Self {
        Self::Instance(value)
    }

    /// Resolve the input to a JSON Schema object.
    pub fn extract_json_schema(&self) -> ProviderResult<Value> {
        let schema = match self {
            Self::Raw(schema) => schema.clone(),
            Self::Type(_) | Self::Instance(_) => {
                let mut schema = T::json_schema();
                if let Value::Object(root) = &mut schema {
                    root.remove("$schema");
                }
                close_objects(&mut schema);
                schema
            }
        };
        if !schema.is_object() {
            return Err(ProviderError::Schema(format!(
                "expected a JSON Schema object, got {}",
                json_kind(&schema)
            )));
        }
        Ok(schema)
    }

    /// Turn a completion into the caller's requested result.
    pub fn rehydrate(&self, completion: ChatCompletion) -> ProviderResult<Structured<T>> {
        match self {
            Self::Raw(_) => Ok(Structured::Raw(completion)),
            Self::Type(_) | Self::Instance(_) => {
                let content = completion.content().ok_or(ProviderError::EmptyResponse)?;
                parse_content(content).map(Structured::Parsed)
            }
        }
    }
}

/// Result of a structured completion.
#[derive(Debug, Clone)]
pub enum Structured<T> {
    /// Model output parsed into the descriptor type
    Parsed(T),
    /// Untouched completion, for raw schema inputs
    Raw(ChatCompletion),
}

impl<T> Structured<T> {
    /// The parsed value, if this was a typed request.
    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// The raw completion, if this was a raw schema request.
    pub fn raw(self) -> Option<ChatCompletion> {
        match self {
            Self::Parsed(_) => None,
            Self::Raw(completion) => Some(completion),
        }
    }
}

/// Parse model output into `T`.
///
/// Local models often wrap JSON in a Markdown fence even when asked for
/// schema-constrained output, so a surrounding ```` ``` ```` block is dropped.
pub fn parse_content<T: DeserializeOwned>(content: &str) -> ProviderResult<T> {
    serde_json::from_str(strip_code_fence(content)).map_err(|e| ProviderError::Validation {
        message: e.to_string(),
        content: content.to_string(),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// Set `additionalProperties: false` on every object schema that leaves it
/// open, as strict structured output requires.
fn close_objects(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            let is_object = map.get("type").is_some_and(|t| t == "object")
                || map.contains_key("properties");
            if is_object && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for value in map.values_mut() {
                close_objects(value);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

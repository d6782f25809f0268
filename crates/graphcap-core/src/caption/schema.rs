//! Caption output shapes.
//!
//! These types double as the JSON Schema sent to the provider and as the
//! target the reply is parsed into.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Category of a graph caption tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Entity,
    Relationship,
    Style,
    Attribute,
    Composition,
    Contextual,
    Technical,
    Semantic,
}

/// A single tagged element of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphTag {
    /// Short name of the element
    pub tag: String,
    /// What kind of element it is
    #[serde(rename = "type")]
    pub tag_type: TagType,
    /// Confidence between 0 and 1
    pub confidence: f32,
}

/// Tagged scene-graph caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphCaption {
    pub tags_list: Vec<GraphTag>,
    pub short_caption: String,
    pub verification: String,
    pub dense_caption: String,
}

/// Formal art critique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtCritique {
    pub visual_elements: Vec<String>,
    pub technical_elements: Vec<String>,
    pub style_elements: Vec<String>,
    pub formal_tenets: Vec<String>,
    pub opinion: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SchemaInput;
    use serde_json::json;

    #[test]
    fn test_graph_caption_schema() {
        let schema = SchemaInput::<GraphCaption>::of().extract_json_schema().unwrap();
        assert_eq!(schema["title"], "GraphCaption");
        for field in ["tags_list", "short_caption", "verification", "dense_caption"] {
            assert!(schema["properties"].get(field).is_some(), "missing {field}");
        }
        let tag = &schema["$defs"]["GraphTag"];
        assert_eq!(tag["additionalProperties"], false);
        assert!(tag["properties"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_graph_caption_parses() {
        let caption: GraphCaption = serde_json::from_value(json!({
            "tags_list": [{"tag": "dog", "type": "entity", "confidence": 0.98}],
            "short_caption": "A dog on a beach.",
            "verification": "dog visible",
            "dense_caption": "A brown dog runs along the shoreline."
        }))
        .unwrap();
        assert_eq!(caption.tags_list[0].tag_type, TagType::Entity);
    }

    #[test]
    fn test_art_critique_schema_title() {
        let schema = SchemaInput::<ArtCritique>::of().extract_json_schema().unwrap();
        assert_eq!(schema["title"], "ArtCritique");
        assert!(schema["properties"].get("opinion").is_some());
    }
}

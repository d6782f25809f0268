//! Structured image captioning on top of the provider layer.
//!
//! A caption run discovers images, sends one structured vision completion
//! per image to a single provider, and emits one [`CaptionRecord`] per image
//! as soon as it completes.

mod discovery;
mod processor;
mod retry;
mod schema;

pub use discovery::{discover_images, is_supported_image, SUPPORTED_EXTENSIONS};
pub use processor::{CaptionOptions, CaptionProcessor};
pub use retry::{backoff_duration, is_retryable};
pub use schema::{ArtCritique, GraphCaption, GraphTag, TagType};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which caption schema and instructions a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    /// Tagged scene-graph caption
    #[default]
    Graph,
    /// Formal art critique
    Art,
}

impl CaptionKind {
    /// Parse a caption type name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "graph" => Some(Self::Graph),
            "art" => Some(Self::Art),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Art => "art",
        }
    }

    /// Name recorded in each result, identifying the caption config.
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::Graph => "graph_caption",
            Self::Art => "art_critic",
        }
    }

    /// Instructions sent alongside the image.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Graph => GRAPH_PROMPT,
            Self::Art => ART_PROMPT,
        }
    }
}

impl fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const GRAPH_PROMPT: &str = "\
Analyze this image and produce a structured caption.

1. tags_list: tag every notable element. Give each tag a type: entity for \
objects and people, relationship for how elements relate, style for artistic \
or photographic style, attribute for properties such as color or texture, \
composition for layout and framing, contextual for setting and time, \
technical for camera and rendering details, semantic for meaning and mood. \
Include a confidence between 0 and 1.
2. short_caption: one concise sentence describing the image.
3. verification: restate which tags are directly visible and which are inferred.
4. dense_caption: a detailed paragraph that weaves the tags into a coherent \
description of the scene.

Only describe what is present in the image.";

const ART_PROMPT: &str = "\
Critique this image as a work of visual art using formal analysis.

List the visual_elements (line, shape, color, texture, value, space), the \
technical_elements (medium, technique, execution), the style_elements \
(movement, period, influences) and the formal_tenets at work (balance, \
contrast, emphasis, rhythm, unity). Finish with an opinion: a short, \
reasoned assessment grounded in the elements above.

Base every statement on what is visible in the image.";

/// One caption result, written as one line of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// Image path as given to the run
    pub filename: String,

    /// Caption config name (see [`CaptionKind::config_name`])
    pub config_name: String,

    /// graphcap version that produced the record
    pub version: String,

    /// Model that was asked
    pub model: String,

    /// Provider name from the provider config
    pub provider: String,

    /// Parsed caption, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,

    /// Failure message, on error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptionRecord {
    pub fn is_success(&self) -> bool {
        self.parsed.is_some()
    }
}

//! Tag and node schemas for documentation markup.
//!
//! [`Config::docs`] is the built-in table used for the documentation site.
//! Projects can add or replace entries from a TOML file:
//!
//! ```toml
//! [tags.callout]
//! render = "Callout"
//! children = ["paragraph"]
//!
//! [tags.callout.attributes.kind]
//! type = "String"
//! required = true
//! matches = ["note", "danger"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use doctree::annotation::AttributeValue;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Node types allowed at document level.
pub const DOCUMENT_CHILDREN: &[&str] = &[
    "heading",
    "paragraph",
    "image",
    "table",
    "tag",
    "fence",
    "blockquote",
    "comment",
    "list",
    "hr",
    "html",
];

/// Node types allowed inside strong emphasis and other inline containers.
pub const INLINE_CHILDREN: &[&str] = &[
    "em",
    "s",
    "link",
    "code",
    "text",
    "tag",
    "softbreak",
    "hardbreak",
];

/// Attributes every tag accepts without declaring them.
pub const GLOBAL_ATTRIBUTES: &[&str] = &["id", "class"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Number,
    Boolean,
}

impl AttributeType {
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (AttributeType::String, AttributeValue::String(_))
                | (AttributeType::Number, AttributeValue::Number(_))
                | (AttributeType::Boolean, AttributeValue::Boolean(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "String",
            AttributeType::Number => "Number",
            AttributeType::Boolean => "Boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSchema {
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub required: bool,
    /// Permitted values; any value of the right type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<AttributeValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AttributeValue>,
    /// Whether the attribute is passed through to the rendered component.
    #[serde(default = "default_render")]
    pub render: bool,
}

fn default_render() -> bool {
    true
}

impl AttributeSchema {
    pub fn new(kind: AttributeType) -> Self {
        AttributeSchema {
            kind,
            required: false,
            matches: None,
            default: None,
            render: true,
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn number() -> Self {
        Self::new(AttributeType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(AttributeType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn matches(mut self, values: &[&str]) -> Self {
        self.matches = Some(
            values
                .iter()
                .map(|v| AttributeValue::String(v.to_string()))
                .collect(),
        );
        self
    }

    pub fn default_value(mut self, value: AttributeValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.render = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagSchema {
    /// Component or element the tag renders as.
    pub render: Option<String>,
    pub self_closing: bool,
    /// Node types allowed as children; anything when absent.
    pub children: Option<Vec<String>>,
    pub attributes: BTreeMap<String, AttributeSchema>,
}

impl TagSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(name: &str) -> Self {
        TagSchema {
            render: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    pub fn children(mut self, allowed: &[&str]) -> Self {
        self.children = Some(allowed.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn attribute(mut self, name: &str, schema: AttributeSchema) -> Self {
        self.attributes.insert(name.to_string(), schema);
        self
    }

    pub fn allows_child(&self, type_name: &str) -> bool {
        self.children
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|c| c == type_name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Custom `{% tag %}` definitions, keyed by tag name.
    pub tags: BTreeMap<String, TagSchema>,
    /// Overrides for built-in Markdown nodes, keyed by node type name.
    pub nodes: BTreeMap<String, TagSchema>,
}

impl Config {
    /// The documentation site's tag and node table.
    pub fn docs() -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(
            "emoji".to_string(),
            TagSchema::render("Emoji")
                .self_closing()
                .attribute("symbol", AttributeSchema::string().required())
                .attribute("alt", AttributeSchema::string().required()),
        );
        tags.insert(
            "coming-soon".to_string(),
            TagSchema::render("ComingSoon").self_closing(),
        );
        tags.insert(
            "details".to_string(),
            TagSchema::render("details").children(DOCUMENT_CHILDREN),
        );
        tags.insert(
            "summary".to_string(),
            TagSchema::render("summary").children(DOCUMENT_CHILDREN),
        );
        tags.insert(
            "sup".to_string(),
            TagSchema::render("sup").children(INLINE_CHILDREN),
        );
        // Rendered by adding a class to each child; see `render::hint_class`.
        tags.insert(
            "hint".to_string(),
            TagSchema::new().children(&["paragraph"]).attribute(
                "kind",
                AttributeSchema::string()
                    .required()
                    .matches(&["warn", "tip", "error"]),
            ),
        );
        tags.insert(
            "related-content".to_string(),
            TagSchema::render("RelatedContent").children(&["tag"]),
        );
        tags.insert(
            "well".to_string(),
            TagSchema::render("Well")
                .children(&["paragraph"])
                .attribute("heading", AttributeSchema::string())
                .attribute("href", AttributeSchema::string())
                .attribute("target", AttributeSchema::string().matches(&["_blank"])),
        );

        let mut nodes = BTreeMap::new();
        nodes.insert(
            "fence".to_string(),
            TagSchema::render("CodeBlock")
                .attribute("content", AttributeSchema::string().required().hidden())
                .attribute(
                    "language",
                    AttributeSchema::string()
                        .default_value(AttributeValue::String("typescript".to_string())),
                )
                .attribute(
                    "process",
                    AttributeSchema::boolean()
                        .default_value(AttributeValue::Boolean(false))
                        .hidden(),
                ),
        );
        nodes.insert(
            "heading".to_string(),
            TagSchema::render("Heading")
                .attribute("level", AttributeSchema::number().required())
                .attribute("id", AttributeSchema::string()),
        );
        nodes.insert(
            "image".to_string(),
            TagSchema::render("img")
                .attribute("src", AttributeSchema::string().required())
                .attribute("alt", AttributeSchema::string())
                .attribute("title", AttributeSchema::string())
                .attribute("width", AttributeSchema::string())
                .attribute("height", AttributeSchema::string()),
        );

        Config { tags, nodes }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            tags = config.tags.len(),
            nodes = config.nodes.len(),
            "loaded tag config"
        );
        Ok(config)
    }

    /// Add `other`'s entries, replacing any with the same name.
    pub fn extend(&mut self, other: Config) {
        self.tags.extend(other.tags);
        self.nodes.extend(other.nodes);
    }

    pub fn tag(&self, name: &str) -> Option<&TagSchema> {
        self.tags.get(name)
    }

    pub fn node(&self, type_name: &str) -> Option<&TagSchema> {
        self.nodes.get(type_name)
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

//! Content blocks shared by tools, resources and prompts.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::mcp::{CallToolResult, Content, ResourceContents};
use crate::store::models::Record;

use super::resources::entity_uri;

/// MIME type of every resource body.
pub const MIME_JSON: &str = "application/json";

/// Compact JSON for resource bodies.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Validation(format!("unserializable value: {e}")))
}

/// Decodes tool arguments. Missing arguments decode as `{}`.
pub fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let value = arguments.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(value).map_err(|e| Error::Validation(format!("arguments: {e}")))
}

/// A resource embedded inline.
pub fn embedded<T: Serialize + ?Sized>(uri: String, value: &T) -> Result<Content> {
    Ok(Content::Resource {
        resource: ResourceContents {
            uri,
            mime_type: Some(MIME_JSON.to_string()),
            text: to_json(value)?,
        },
    })
}

/// A record embedded under its own URI.
pub fn embedded_record<T: Record + Serialize>(record: &T) -> Result<Content> {
    embedded(entity_uri(T::COLLECTION, record.code()), record)
}

/// A link to a record the client can read on its own.
pub fn link<T: Record>(record: &T) -> Content {
    Content::ResourceLink {
        uri: entity_uri(T::COLLECTION, record.code()),
        name: record.name().to_string(),
        description: Some(format!("{} {}", T::COLLECTION.entity(), record.code())),
        mime_type: Some(MIME_JSON.to_string()),
    }
}

/// `message`, then `blocks`, then the structured value echoed as text for
/// clients that ignore `structuredContent`.
pub fn tool_result(
    message: impl Into<String>,
    blocks: Vec<Content>,
    structured: Value,
) -> CallToolResult {
    let echo = structured.to_string();
    let mut result = CallToolResult::text(message);
    for block in blocks {
        result = result.with_content(block);
    }
    result.with_content(Content::text(echo)).with_structured(structured)
}

/// Lower-case entity name, e.g. `tag`.
pub fn noun<T: Record>() -> String {
    T::COLLECTION.entity().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::Tag;
    use serde_json::json;

    fn tag() -> Tag {
        Tag {
            id: "id-1".to_string(),
            code: "TAG001".to_string(),
            name: "Frontend".to_string(),
        }
    }

    #[test]
    fn test_link_points_at_entity_uri() {
        let Content::ResourceLink { uri, name, .. } = link(&tag()) else {
            panic!("expected a resource link");
        };
        assert_eq!(uri, "contract-manager://tags/TAG001");
        assert_eq!(name, "Frontend");
    }

    #[test]
    fn test_tool_result_layout() -> anyhow::Result<()> {
        let result = tool_result(
            "done",
            vec![embedded_record(&tag())?],
            json!({"tag": {"code": "TAG001"}}),
        );
        assert_eq!(result.content.len(), 3);
        assert!(matches!(&result.content[0], Content::Text { text } if text == "done"));
        assert!(matches!(
            &result.content[1],
            Content::Resource { resource } if resource.uri.ends_with("/TAG001")
        ));
        assert_eq!(result.structured_content, Some(json!({"tag": {"code": "TAG001"}})));
        assert!(result.is_error.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_args_defaults_to_empty_object() -> anyhow::Result<()> {
        #[derive(serde::Deserialize)]
        struct Optional {
            #[serde(default)]
            steps: Option<u32>,
        }
        let parsed: Optional = parse_args(None)?;
        assert!(parsed.steps.is_none());

        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code, reason = "Only decoding is exercised")]
        struct Required {
            code: String,
        }
        let err = parse_args::<Required>(Some(json!({}))).err();
        assert!(matches!(err, Some(Error::Validation(_))));
        Ok(())
    }

    #[test]
    fn test_noun() {
        assert_eq!(noun::<Tag>(), "tag");
    }
}

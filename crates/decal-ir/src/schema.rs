use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::message::{ImportReply, ImportRequest};

static MESSAGE_SCHEMA: OnceLock<JSONSchema> = OnceLock::new();

fn compile_schema(source: &'static str) -> JSONSchema {
    let schema_value: Value =
        serde_json::from_str(source).expect("embedded schema should parse as JSON");
    JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(&schema_value)
        .expect("embedded schema should compile")
}

fn message_schema() -> &'static JSONSchema {
    MESSAGE_SCHEMA
        .get_or_init(|| compile_schema(include_str!("../schema/import_message.schema.json")))
}

fn validate_value(schema: &JSONSchema, value: &Value, label: &str) -> Result<()> {
    if let Err(errors) = schema.validate(value) {
        let messages: Vec<String> = errors.into_iter().map(|err| err.to_string()).collect();
        let joined = messages.join("\n");
        return Err(anyhow!("{label} failed schema validation:\n{joined}"));
    }
    Ok(())
}

/// Validates a `serde_json::Value` against the import message schema. Both
/// the request and the replies share one envelope schema.
pub fn validate_message_value(value: &Value) -> Result<()> {
    validate_value(message_schema(), value, "import message")
}

/// Validates a typed [`ImportRequest`] before it goes on the wire.
pub fn validate_request(request: &ImportRequest) -> Result<()> {
    let value = serde_json::to_value(request)?;
    validate_message_value(&value)
}

/// Validates a typed [`ImportReply`] before it goes on the wire.
pub fn validate_reply(reply: &ImportReply) -> Result<()> {
    let value = serde_json::to_value(reply)?;
    validate_message_value(&value)
}

#[cfg(test)]
mod tests {
    use decal_css::Rgba;

    use super::*;
    use crate::node::{IrNode, IrRect, TextSegment};
    use crate::style::IrStyle;

    fn sample_request() -> ImportRequest {
        let mut heading = IrNode::new("h1", IrRect::new(20.0, 20.0, 360.0, 40.0));
        heading.text = "Launch".to_owned();
        heading.style = IrStyle {
            color: Some(Rgba::from_u8(20, 20, 20)),
            font_family: Some("Inter".to_owned()),
            font_size: Some(32.0),
            font_weight: Some("700".to_owned()),
            ..IrStyle::default()
        };

        let mut paragraph = IrNode::new("p", IrRect::new(20.0, 80.0, 360.0, 20.0));
        paragraph.text = "Hello bold world".to_owned();
        paragraph.text_segments = vec![
            TextSegment { text: "Hello ".to_owned(), bold: false, color: None },
            TextSegment { text: "bold".to_owned(), bold: true, color: None },
            TextSegment { text: " world".to_owned(), bold: false, color: None },
        ];

        let mut root = IrNode::new("body", IrRect::new(0.0, 0.0, 400.0, 300.0));
        root.style.background_color = Some(Rgba::WHITE);
        root.children.push(heading);
        root.children.push(paragraph);
        ImportRequest::new(root)
    }

    #[test]
    fn accepts_a_representative_request() {
        validate_request(&sample_request()).expect("sample request should satisfy schema");
    }

    #[test]
    fn accepts_both_reply_shapes() {
        validate_reply(&ImportReply::done(3, 2)).expect("done reply should satisfy schema");
        validate_reply(&ImportReply::error("no usable font")).expect("error reply should satisfy schema");
    }

    #[test]
    fn rejects_unrounded_geometry() {
        let node = IrNode::new("div", IrRect::new(1.5, 0.0, 10.0, 10.0));
        let value = serde_json::to_value(ImportRequest::new(node)).expect("request serializes");
        assert!(validate_message_value(&value).is_err());
    }

    #[test]
    fn rejects_unknown_message_types() {
        let value = serde_json::json!({"type": "import-jpeg", "data": {}});
        assert!(validate_message_value(&value).is_err());
    }

    #[test]
    fn rejects_stray_node_fields() {
        let value = serde_json::json!({
            "type": "import-dom",
            "data": {
                "kind": "body",
                "rect": {"x": 0, "y": 0, "w": 10, "h": 10},
                "zIndex": 4
            }
        });
        assert!(validate_message_value(&value).is_err());
    }
}

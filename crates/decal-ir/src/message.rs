//! Messages exchanged across the import boundary.
//!
//! Exactly one request shape and two reply shapes exist; the `type` tag
//! discriminates. Field casing here is wire format, not Rust convention.

use serde::{Deserialize, Serialize};

use crate::node::IrNode;

/// Sent from the extraction side after a page walk completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImportRequest {
    /// The extracted tree, rooted at the document body.
    ImportDom { data: IrNode },
}

impl ImportRequest {
    pub fn new(data: IrNode) -> Self {
        Self::ImportDom { data }
    }

    pub fn data(&self) -> &IrNode {
        match self {
            Self::ImportDom { data } => data,
        }
    }
}

/// Sent back once reconstruction finishes, or fails at the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImportReply {
    #[serde(rename_all = "camelCase")]
    ImportDone { frame_count: u32, text_count: u32 },
    ImportError { error: String },
}

impl ImportReply {
    pub fn done(frame_count: u32, text_count: u32) -> Self {
        Self::ImportDone { frame_count, text_count }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::ImportError { error: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::IrRect;

    #[test]
    fn request_carries_the_kebab_case_tag() {
        let request = ImportRequest::new(IrNode::new("body", IrRect::new(0.0, 0.0, 800.0, 600.0)));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "import-dom");
        assert_eq!(json["data"]["kind"], "body");
    }

    #[test]
    fn done_reply_uses_camel_case_counts() {
        let json = serde_json::to_value(ImportReply::done(12, 7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "import-done", "frameCount": 12, "textCount": 7})
        );
    }

    #[test]
    fn error_reply_round_trips() {
        let reply = ImportReply::error("font ladder exhausted");
        let text = serde_json::to_string(&reply).unwrap();
        assert!(text.contains(r#""type":"import-error""#));
        let back: ImportReply = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn request_round_trips_through_json() {
        let mut root = IrNode::new("body", IrRect::new(0.0, 0.0, 100.0, 50.0));
        root.children.push(IrNode::new("div", IrRect::new(4.0, 4.0, 92.0, 42.0)));
        let request = ImportRequest::new(root);
        let text = serde_json::to_string(&request).unwrap();
        let back: ImportRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, request);
    }
}

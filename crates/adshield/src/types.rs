//! Core data types shared by the classifier, interceptor and guard.

use serde::{Deserialize, Serialize};

/// Status code returned for every blocked request.
pub const BLOCKED_STATUS: u16 = 403;

/// Reason phrase returned for every blocked request.
pub const BLOCKED_REASON: &str = "Blocked";

/// Content type of the synthetic blocked response.
pub const BLOCKED_CONTENT_TYPE: &str = "text/plain";

/// A fabricated response served in place of the origin's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SyntheticResponse {
    /// The fixed rejection handed back for blocked requests.
    pub fn blocked() -> Self {
        Self {
            status: BLOCKED_STATUS,
            reason: BLOCKED_REASON.to_string(),
            headers: vec![(
                "Content-Type".to_string(),
                BLOCKED_CONTENT_TYPE.to_string(),
            )],
            body: Vec::new(),
        }
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Which rule caused a request to be blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// The host equals, or is a subdomain of, a blocked hostname.
    Hostname { rule: String },
    /// The path contains `contains` and ends with `ends_with`.
    PathPattern { contains: String, ends_with: String },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Hostname { rule } => write!(f, "hostname {rule}"),
            BlockReason::PathPattern {
                contains,
                ends_with,
            } => write!(f, "path contains {contains:?} and ends with {ends_with:?}"),
        }
    }
}

/// Outcome of classifying one request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Classification {
    Allow,
    Block { reason: BlockReason },
}

impl Classification {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Classification::Block { .. })
    }

    /// The response to serve instead of the network, if blocked.
    pub fn synthetic_response(&self) -> Option<SyntheticResponse> {
        match self {
            Classification::Allow => None,
            Classification::Block { .. } => Some(SyntheticResponse::blocked()),
        }
    }
}

/// Kind of resource a request was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    WebSocket,
    Manifest,
    Other,
}

impl ResourceType {
    /// Map a browser-reported resource type name onto a `ResourceType`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "document" => ResourceType::Document,
            "stylesheet" => ResourceType::Stylesheet,
            "image" => ResourceType::Image,
            "media" => ResourceType::Media,
            "font" => ResourceType::Font,
            "script" => ResourceType::Script,
            "xhr" => ResourceType::Xhr,
            "fetch" => ResourceType::Fetch,
            "websocket" => ResourceType::WebSocket,
            "manifest" => ResourceType::Manifest,
            _ => ResourceType::Other,
        }
    }
}

/// A network request observed before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
    pub resource_type: ResourceType,
}

impl ResourceRequest {
    pub fn new(url: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            url: url.into(),
            resource_type,
        }
    }
}

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Let the request proceed unmodified.
    Continue,
    /// Answer the request with this response; it never reaches the network.
    Fulfill(SyntheticResponse),
}

/// Errors that can occur in the shield library.
#[derive(thiserror::Error, Debug)]
pub enum ShieldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Malformed request URL: {0}")]
    MalformedRequestUrl(#[from] url::ParseError),
}

/// Convenience result type.
pub type ShieldResult<T> = Result<T, ShieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_response_shape() {
        let resp = SyntheticResponse::blocked();
        assert_eq!(resp.status, 403);
        assert_eq!(resp.reason, "Blocked");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_allow_has_no_response() {
        assert!(Classification::Allow.synthetic_response().is_none());
        assert!(!Classification::Allow.is_blocked());
    }

    #[test]
    fn test_resource_type_from_name() {
        assert_eq!(ResourceType::from_name("XHR"), ResourceType::Xhr);
        assert_eq!(ResourceType::from_name("WebSocket"), ResourceType::WebSocket);
        assert_eq!(ResourceType::from_name("Ping"), ResourceType::Other);
    }

    #[test]
    fn test_classification_serializes_with_reason() {
        let c = Classification::Block {
            reason: BlockReason::Hostname {
                rule: "doubleclick.net".into(),
            },
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["decision"], "block");
        assert_eq!(json["reason"]["kind"], "hostname");
        assert_eq!(json["reason"]["rule"], "doubleclick.net");
    }
}

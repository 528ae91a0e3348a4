//! Request definitions
//!
//! A request is a sum type over its protocol variants. Every variant embeds a
//! [`RequestCommon`] block carrying identity, URL, headers, auth and
//! extraction rules; the variant adds its protocol-specific fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::scope::DynamicVariable;

/// Discriminant of a [`Request`], used for executor dispatch and caching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Rest,
    GraphQl,
    WebSocket,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Rest => "rest",
            RequestKind::GraphQl => "graphql",
            RequestKind::WebSocket => "websocket",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("Unknown HTTP method: '{}'", s)),
        }
    }
}

/// Request body encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    #[default]
    None,
    Json,
    Xml,
    Text,
    Html,
    JavaScript,
    FormData,
}

impl BodyType {
    /// Content-Type sent when the request does not set one itself
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::None | BodyType::FormData => None,
            BodyType::Json => Some("application/json"),
            BodyType::Xml => Some("application/xml"),
            BodyType::Text => Some("text/plain"),
            BodyType::Html => Some("text/html"),
            BodyType::JavaScript => Some("application/javascript"),
        }
    }
}

/// Authentication attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    BearerToken {
        token: String,
    },
}

/// Rule pulling a value out of a response into a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseExtraction {
    /// JSONPath (`$.token`) or XPath (`/root/token`) pattern
    pub pattern: String,
    /// Variable receiving the extracted value
    pub variable_name: String,
    /// Write into the collection scope instead of the environment
    #[serde(default)]
    pub save_to_collection: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Fields shared by every request variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCommon {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extractions: Vec<ResponseExtraction>,
    /// Request-level dynamic variable definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_variables: Vec<DynamicVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl RequestCommon {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive header lookup; keys keep their original case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

}

/// Plain text multipart field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// File attached to a multipart body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFile {
    pub key: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// HTTP request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub body_type: BodyType,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query_params: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_files: Vec<FormFile>,
}

/// GraphQL operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Query,
    Mutation,
    Subscription,
}

/// Transport used for GraphQL subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionTransport {
    #[default]
    WebSocket,
    #[serde(rename = "SSE")]
    Sse,
}

/// GraphQL request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    pub query: String,
    /// JSON-encoded variables object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub operation_type: OperationType,
    #[serde(default)]
    pub subscription_transport: SubscriptionTransport,
}

/// WebSocket connection flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionFlavor {
    #[default]
    Standard,
    #[serde(rename = "GraphQLSubscription")]
    GraphQlSubscription,
}

/// WebSocket request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSocketRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub flavor: ConnectionFlavor,
}

/// A stored request, tagged by protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Rest(RestRequest),
    #[serde(rename = "graphql")]
    GraphQl(GraphQlRequest),
    #[serde(rename = "websocket")]
    WebSocket(WebSocketRequest),
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Rest(_) => RequestKind::Rest,
            Request::GraphQl(_) => RequestKind::GraphQl,
            Request::WebSocket(_) => RequestKind::WebSocket,
        }
    }

    pub fn common(&self) -> &RequestCommon {
        match self {
            Request::Rest(r) => &r.common,
            Request::GraphQl(r) => &r.common,
            Request::WebSocket(r) => &r.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut RequestCommon {
        match self {
            Request::Rest(r) => &mut r.common,
            Request::GraphQl(r) => &mut r.common,
            Request::WebSocket(r) => &mut r.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.common().collection_id.as_deref()
    }
}

impl From<RestRequest> for Request {
    fn from(r: RestRequest) -> Self {
        Request::Rest(r)
    }
}

impl From<GraphQlRequest> for Request {
    fn from(r: GraphQlRequest) -> Self {
        Request::GraphQl(r)
    }
}

impl From<WebSocketRequest> for Request {
    fn from(r: WebSocketRequest) -> Self {
        Request::WebSocket(r)
    }
}

//! HTTP Basic Authentication (RFC 7617)

use base64::Engine;

/// HTTP Basic Authentication credentials
#[derive(Debug, Clone)]
pub struct BasicAuth<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> BasicAuth<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        Self { username, password }
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }
}

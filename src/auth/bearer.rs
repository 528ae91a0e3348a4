//! Bearer Token Authentication (RFC 6750)

/// Bearer token authentication
#[derive(Debug, Clone)]
pub struct BearerAuth<'a> {
    token: &'a str,
}

impl<'a> BearerAuth<'a> {
    pub fn new(token: &'a str) -> Self {
        Self { token }
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

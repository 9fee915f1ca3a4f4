//! Structured error payloads carried by non-2xx responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error code reported by the backend in a failed response.
///
/// Only a handful of codes matter to the session layer; everything else is
/// preserved verbatim in [`ServiceErrorCode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ServiceErrorCode {
    /// The access (or refresh) token is no longer accepted.
    InvalidSession,
    /// The request needed authentication and carried none.
    MissingAuthReq,
    /// The login provider does not exist for this app.
    AuthProviderNotFound,
    /// A request parameter was rejected.
    InvalidParameter,
    /// The called function does not exist.
    FunctionNotFound,
    /// The named service does not exist.
    ServiceNotFound,
    /// No code could be read from the payload.
    #[default]
    Unknown,
    /// Any other code.
    Other(String),
}

impl ServiceErrorCode {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidSession => "InvalidSession",
            Self::MissingAuthReq => "MissingAuthReq",
            Self::AuthProviderNotFound => "AuthProviderNotFound",
            Self::InvalidParameter => "InvalidParameter",
            Self::FunctionNotFound => "FunctionNotFound",
            Self::ServiceNotFound => "ServiceNotFound",
            Self::Unknown => "Unknown",
            Self::Other(code) => code,
        }
    }

    /// Returns true for the codes that mean the session must be refreshed.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        matches!(self, Self::InvalidSession)
    }
}

impl From<String> for ServiceErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "InvalidSession" => Self::InvalidSession,
            "MissingAuthReq" => Self::MissingAuthReq,
            "AuthProviderNotFound" => Self::AuthProviderNotFound,
            "InvalidParameter" => Self::InvalidParameter,
            "FunctionNotFound" => Self::FunctionNotFound,
            "ServiceNotFound" => Self::ServiceNotFound,
            "" | "Unknown" => Self::Unknown,
            _ => Self::Other(code),
        }
    }
}

impl From<ServiceErrorCode> for String {
    fn from(code: ServiceErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceErrorPayload {
    /// Human-readable message.
    #[serde(default, alias = "message")]
    pub error: String,
    /// Machine-readable code.
    #[serde(default, alias = "serviceErrorCode")]
    pub error_code: ServiceErrorCode,
    /// Optional documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ServiceErrorPayload {
    /// Decodes an error body.
    ///
    /// Bodies that are not the structured JSON form are kept as the message
    /// with an [`ServiceErrorCode::Unknown`] code.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|_| Self {
            error: String::from_utf8_lossy(body).into_owned(),
            error_code: ServiceErrorCode::Unknown,
            link: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decodes_structured_payload() {
        let payload =
            ServiceErrorPayload::from_body(br#"{"error":"token expired","error_code":"InvalidSession"}"#);
        assert_eq!(payload.error, "token expired");
        assert!(payload.error_code.is_invalid_session());
    }

    #[test]
    fn test_accepts_camel_case_code_field() {
        let payload = ServiceErrorPayload::from_body(br#"{"serviceErrorCode":"InvalidSession"}"#);
        assert_eq!(payload.error_code, ServiceErrorCode::InvalidSession);
        assert_eq!(payload.error, "");
    }

    #[test]
    fn test_unstructured_body_is_kept_as_message() {
        let payload = ServiceErrorPayload::from_body(b"<html>bad gateway</html>");
        assert_eq!(payload.error, "<html>bad gateway</html>");
        assert_eq!(payload.error_code, ServiceErrorCode::Unknown);
    }

    #[test]
    fn test_unknown_codes_round_trip() {
        let code = ServiceErrorCode::from("SomethingNew".to_string());
        assert_eq!(code, ServiceErrorCode::Other("SomethingNew".to_string()));
        assert_eq!(code.to_string(), "SomethingNew");
        assert!(!code.is_invalid_session());
    }
}

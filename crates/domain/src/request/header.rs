//! HTTP Header types

use serde::{Deserialize, Serialize};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";
/// Header describing the body encoding.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Header listing acceptable response encodings.
pub const ACCEPT: &str = "Accept";
/// JSON media type.
pub const APPLICATION_JSON: &str = "application/json";

/// A single HTTP header with name and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The header name (e.g., "Content-Type")
    pub name: String,
    /// The header value (e.g., "application/json")
    pub value: String,
}

impl Header {
    /// Creates a new header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Formats a bearer authorization header for the given token.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self::new(AUTHORIZATION, format!("Bearer {token}"))
    }
}

/// An ordered collection of HTTP headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    items: Vec<Header>,
}

impl Headers {
    /// Creates an empty header collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Sets a header, replacing any existing header with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let header = Header::new(name, value);
        match self
            .items
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&header.name))
        {
            Some(existing) => *existing = header,
            None => self.items.push(header),
        }
    }

    /// Builder-style variant of [`Headers::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of a header by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Removes a header by case-insensitive name.
    pub fn remove(&mut self, name: &str) -> Option<Header> {
        let index = self
            .items
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))?;
        Some(self.items.remove(index))
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.items.iter()
    }

    /// Returns the number of headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len is not const in stable
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::is_empty is not const in stable
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        let mut headers = Self::new();
        for header in iter {
            headers.set(header.name, header.value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_replaces_case_insensitively() {
        let mut headers = Headers::new();
        headers.set("authorization", "Bearer old");
        headers.set(AUTHORIZATION, "Bearer new");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("AUTHORIZATION"), Some("Bearer new"));
    }

    #[test]
    fn test_bearer_header() {
        let header = Header::bearer("t2");
        assert_eq!(header.name, "Authorization");
        assert_eq!(header.value, "Bearer t2");
    }

    #[test]
    fn test_remove_header() {
        let mut headers = Headers::new().with(ACCEPT, APPLICATION_JSON);
        assert!(headers.remove("accept").is_some());
        assert!(headers.is_empty());
        assert!(headers.remove("accept").is_none());
    }
}

//! Multi-value response headers.

use std::collections::BTreeMap;

/// Response headers keyed by lower-cased name.
///
/// Repeated headers (`Set-Cookie`, `Vary`, ...) keep every value in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: BTreeMap<String, Vec<String>>,
}

impl ResponseHeaders {
    /// Empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one header line. Surrounding whitespace is trimmed from name and value.
    pub fn append(&mut self, name: &str, value: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }

    /// First value for a header, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value for a header, ignoring case.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lower-cased name, values)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

impl From<&http::HeaderMap> for ResponseHeaders {
    fn from(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            // Non-UTF-8 values are skipped
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }
        headers
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let headers: ResponseHeaders = [("Content-Type", "application/json")]
            .into_iter()
            .collect();

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.iter().next().map(|(name, _)| name), Some("content-type"));
    }

    #[test]
    fn repeated_headers_accumulate() {
        let headers: ResponseHeaders = [
            ("Set-Cookie", "a=1"),
            ("set-cookie", " b=2 "),
            ("X-Id", "7"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get_all("set-cookie"), &["a=1", "b=2"]);
        assert_eq!(headers.get("set-cookie"), Some("a=1"));
    }

    #[test]
    fn missing_header() {
        let headers = ResponseHeaders::new();
        assert!(headers.is_empty());
        assert!(headers.get("x").is_none());
        assert!(headers.get_all("x").is_empty());
    }

    #[test]
    fn blank_names_are_ignored() {
        let mut headers = ResponseHeaders::new();
        headers.append("  ", "value");
        assert!(headers.is_empty());
    }

    #[test]
    fn from_http_header_map() {
        let mut map = http::HeaderMap::new();
        map.append("vary", http::HeaderValue::from_static("accept"));
        map.append("vary", http::HeaderValue::from_static("origin"));

        let headers = ResponseHeaders::from(&map);
        assert_eq!(headers.get_all("Vary"), &["accept", "origin"]);
    }
}

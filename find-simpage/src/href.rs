//! Conversion between href strings and pairs of a path and a query.
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::{form_urlencoded, Url};

/// Query parameters in their order of appearance, without duplicated keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of `key`. A known key keeps its position and takes the new value.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.params.push((key, value)),
        }
    }

    /// Gets the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over the pairs of keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Gets the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Checks if no parameter is given.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parses a form-urlencoded query string, returning `None` if it has no parameter.
    pub fn parse(query: &str) -> Option<Self> {
        let query: Self = form_urlencoded::parse(query.as_bytes()).collect();
        if query.is_empty() {
            None
        } else {
            Some(query)
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (k, v) in iter {
            query.insert(k, v);
        }
        query
    }
}

impl Serialize for Query {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct QueryVisitor;

        impl<'de> Visitor<'de> for QueryVisitor {
            type Value = Query;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of query parameters")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut query = Query::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    query.insert(k, v);
                }
                Ok(query)
            }
        }

        deserializer.deserialize_map(QueryVisitor)
    }
}

/// A decoded href.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Href {
    /// Path without the query and the fragment.
    pub path: String,
    /// Query parameters, or `None` if there is none.
    pub query: Option<Query>,
}

/// Decodes an href into its path and query.
///
/// Absolute URLs are parsed as such; relative references keep their path as written.
///
/// # Examples
///
/// ```
/// use find_simpage::href;
///
/// let h = href::decode("/search?q=rust&page=2#top").unwrap();
/// assert_eq!(h.path, "/search");
/// let query = h.query.unwrap();
/// assert_eq!(query.keys().collect::<Vec<_>>(), vec!["q", "page"]);
///
/// let h = href::decode("http://localhost:8080/login").unwrap();
/// assert_eq!(h.path, "/login");
/// assert!(h.query.is_none());
/// ```
pub fn decode(href: &str) -> Result<Href, url::ParseError> {
    match Url::parse(href) {
        Ok(url) => Ok(Href {
            path: url.path().to_string(),
            query: url.query().and_then(Query::parse),
        }),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let href = href.split('#').next().unwrap_or_default();
            let (path, query) = match href.split_once('?') {
                Some((path, query)) => (path, Query::parse(query)),
                None => (href, None),
            };
            Ok(Href {
                path: path.to_string(),
                query,
            })
        }
        Err(e) => Err(e),
    }
}

/// Encodes a path and a query into an href.
///
/// # Examples
///
/// ```
/// use find_simpage::href::{self, Query};
///
/// let query: Query = [("q", "a b"), ("page", "2")].into_iter().collect();
/// assert_eq!(href::encode("/search", Some(&query)), "/search?q=a+b&page=2");
/// assert_eq!(href::encode("/", None), "/");
/// ```
pub fn encode(path: &str, query: Option<&Query>) -> String {
    match query {
        Some(query) if !query.is_empty() => {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            format!("{path}?{query}")
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_relative() {
        let h = decode("item.php?id=3&sort=asc").unwrap();
        assert_eq!(h.path, "item.php");
        let query = h.query.unwrap();
        assert_eq!(query.get("id"), Some("3"));
        assert_eq!(query.get("sort"), Some("asc"));
    }

    #[test]
    fn test_decode_without_path() {
        let h = decode("?a=1").unwrap();
        assert_eq!(h.path, "");
        assert_eq!(h.query.unwrap().get("a"), Some("1"));

        let h = decode("#section").unwrap();
        assert_eq!(h, Href::default());

        let h = decode("/path?").unwrap();
        assert_eq!(h.path, "/path");
        assert!(h.query.is_none());
    }

    #[test]
    fn test_decode_duplicated_keys() {
        let h = decode("/p?a=1&b=2&a=3").unwrap();
        let query = h.query.unwrap();
        assert_eq!(query.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_decode_percent_encoding() {
        let h = decode("http://example.com/a%20b?name=%E3%81%82&x=1+2").unwrap();
        assert_eq!(h.path, "/a%20b");
        let query = h.query.unwrap();
        assert_eq!(query.get("name"), Some("あ"));
        assert_eq!(query.get("x"), Some("1 2"));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode("http://[::1").is_err());
    }

    #[test]
    fn test_encode_decode() {
        let query: Query = [("user", "alice"), ("next", "/home?x=1")].into_iter().collect();
        let encoded = encode("/login", Some(&query));
        let h = decode(&encoded).unwrap();
        assert_eq!(h.path, "/login");
        assert_eq!(h.query, Some(query));
    }

    #[test]
    fn test_query_serde_keeps_order() {
        let query: Query = [("z", "1"), ("a", "2")].into_iter().collect();
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"z":"1","a":"2"}"#);
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}

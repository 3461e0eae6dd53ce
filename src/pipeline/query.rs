//! Query string parsing stage.

use axum::{extract::Request, middleware::Next, response::Response};

/// Decoded query pairs in request order, stored in request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, for repeated parameters.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub async fn parse_query(mut req: Request, next: Next) -> Response {
    let params = req.uri().query().map(QueryParams::parse).unwrap_or_default();
    req.extensions_mut().insert(params);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let params = QueryParams::parse("page=2&tag=a&tag=b&q=hello%20world");
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.get("q"), Some("hello world"));
        assert_eq!(params.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_empty() {
        assert!(QueryParams::parse("").is_empty());
    }
}

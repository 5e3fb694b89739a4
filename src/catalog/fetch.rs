use std::path::Path;

use bytes::Bytes;
use url::Url;

use crate::error::CatalogError;
use crate::http::HttpClient;

use super::{Catalog, parse_catalog};

/// Base URL of the public podcast API serving show documents
pub const DEFAULT_SHOW_API: &str = "https://podcast-api.netlify.app";

/// Load a catalogue from a URL, a local file or a bare show id.
///
/// Show ids are resolved against `api_base` (see [`show_url`]).
pub async fn load_catalog<C: HttpClient>(
    client: &C,
    source: &str,
    api_base: &str,
) -> Result<Catalog, CatalogError> {
    let source = source.trim();

    if is_url(source) {
        let bytes = fetch_bytes(client, source).await?;
        return parse_catalog(&bytes, source);
    }

    let path = Path::new(source);
    if !source.is_empty() && path.is_file() {
        let bytes = read_file(path)?;
        return parse_catalog(&bytes, &path_origin(path));
    }

    let url = show_url(api_base, source)?;
    let bytes = fetch_bytes(client, url.as_str()).await?;
    parse_catalog(&bytes, url.as_str())
}

/// URL of a show document: `{api_base}/id/{id}`
pub fn show_url(api_base: &str, id: &str) -> Result<Url, CatalogError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CatalogError::EmptyShowId);
    }

    Ok(Url::parse(&format!(
        "{}/id/{}",
        api_base.trim_end_matches('/'),
        id
    ))?)
}

/// Determine if a string is a URL or something else
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, CatalogError> {
    let response = client
        .get(url)
        .await
        .map_err(|e| CatalogError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(CatalogError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(response.body)
}

fn read_file(path: &Path) -> Result<Vec<u8>, CatalogError> {
    std::fs::read(path).map_err(|e| CatalogError::FileReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A `file://` URL for the path when it can be made absolute, the plain path otherwise
fn path_origin(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|absolute| Url::from_file_path(absolute).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const SHOW_JSON: &str = r#"{
        "id": "10716",
        "title": "Something Was Wrong",
        "seasons": [
            { "season": 1, "episodes": [
                { "episode": 1, "title": "Chapter 1", "file": "https://example.com/1.mp3" }
            ] }
        ]
    }"#;

    struct MockHttpClient {
        status: u16,
        body: &'static str,
        requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: self.status,
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    #[test]
    fn is_url_detects_http() {
        assert!(is_url("http://example.com/feed.xml"));
        assert!(is_url("https://example.com/feed.xml"));
    }

    #[test]
    fn is_url_rejects_file_paths_and_ids() {
        assert!(!is_url("/path/to/feed.xml"));
        assert!(!is_url("./feed.xml"));
        assert!(!is_url("10716"));
    }

    #[test]
    fn show_url_joins_base_and_id() {
        let url = show_url("https://podcast-api.netlify.app/", "10716").unwrap();
        assert_eq!(url.as_str(), "https://podcast-api.netlify.app/id/10716");
    }

    #[test]
    fn show_url_requires_an_id() {
        assert!(matches!(
            show_url(DEFAULT_SHOW_API, "  "),
            Err(CatalogError::EmptyShowId)
        ));
    }

    #[tokio::test]
    async fn bare_id_is_fetched_from_show_api() {
        let client = MockHttpClient::new(200, SHOW_JSON);

        let catalog = load_catalog(&client, "10716", "https://api.example.com")
            .await
            .unwrap();

        assert_eq!(catalog.title, "Something Was Wrong");
        assert_eq!(
            client.requested.lock().unwrap().as_slice(),
            &["https://api.example.com/id/10716".to_string()]
        );
    }

    #[tokio::test]
    async fn url_is_fetched_directly() {
        let client = MockHttpClient::new(200, SHOW_JSON);

        load_catalog(&client, "https://example.com/show.json", DEFAULT_SHOW_API)
            .await
            .unwrap();

        assert_eq!(
            client.requested.lock().unwrap().as_slice(),
            &["https://example.com/show.json".to_string()]
        );
    }

    #[tokio::test]
    async fn http_errors_are_reported() {
        let client = MockHttpClient::new(404, "Not Found");

        let result = load_catalog(&client, "99999", DEFAULT_SHOW_API).await;

        match result {
            Err(CatalogError::HttpStatus { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/id/99999"));
            }
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_file_is_read_without_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("show.json");
        std::fs::write(&path, SHOW_JSON).unwrap();
        let client = MockHttpClient::new(500, "");

        let catalog = load_catalog(&client, path.to_str().unwrap(), DEFAULT_SHOW_API)
            .await
            .unwrap();

        assert_eq!(catalog.entries.len(), 1);
        assert!(client.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_source_is_rejected() {
        let client = MockHttpClient::new(200, SHOW_JSON);

        let result = load_catalog(&client, "", DEFAULT_SHOW_API).await;

        assert!(matches!(result, Err(CatalogError::EmptyShowId)));
    }
}

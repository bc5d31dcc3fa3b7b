//! Synology Photos Web API client

use crate::error::{is_session_code, Result, SynologyError};
use crate::types::{ApiResponse, ItemList, LoginData, PhotoItem};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const AUTH_API: &str = "SYNO.API.Auth";
const SEARCH_API: &str = "SYNO.Foto.Search.Search";
const DOWNLOAD_API: &str = "SYNO.Foto.Download";
const SESSION_NAME: &str = "SynologyPhotos";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LIST_LIMIT: &str = "500";

/// Additional item fields requested with every album listing
pub const DEFAULT_ADDITIONAL: &[&str] = &[
    "thumbnail",
    "resolution",
    "orientation",
    "video_convert",
    "video_meta",
    "address",
];

/// Client for a single Synology Photos account.
///
/// Logs in lazily on first use and transparently logs in again when the
/// NAS reports that the session expired.
pub struct SynologyPhotosClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    sid: RwLock<Option<String>>,
}

impl SynologyPhotosClient {
    /// Create a client for `base_url` (e.g. `https://nas.local:5001`)
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self::with_options(base_url, username, password, true)
    }

    /// Create a client, optionally accepting self-signed NAS certificates
    pub fn with_options(base_url: &str, username: &str, password: &str, verify_tls: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            sid: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/webapi/{}", self.base_url, path)
    }

    /// Open a new session and remember its id
    pub async fn login(&self) -> Result<()> {
        let params = [
            ("api", AUTH_API),
            ("version", "6"),
            ("method", "login"),
            ("account", self.username.as_str()),
            ("passwd", self.password.as_str()),
            ("session", SESSION_NAME),
            ("format", "sid"),
        ];

        let response = self
            .client
            .post(self.api_url("entry.cgi"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(&params))
            .send()
            .await?;

        let data: LoginData = decode_envelope(AUTH_API, response).await?;
        *self.sid.write().await = Some(data.sid);

        info!(base_url = %self.base_url, user = %self.username, "Logged in to Synology Photos");
        Ok(())
    }

    /// End the current session, if any
    pub async fn logout(&self) -> Result<()> {
        let Some(sid) = self.sid.write().await.take() else {
            return Ok(());
        };

        let params = [
            ("api", AUTH_API),
            ("version", "6"),
            ("method", "logout"),
            ("session", SESSION_NAME),
            ("_sid", sid.as_str()),
        ];

        let response = self
            .client
            .post(self.api_url("entry.cgi"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(&params))
            .send()
            .await?;

        decode_envelope::<serde_json::Value>(AUTH_API, response)
            .await
            .or_else(|e| match e {
                // Logout answers success without a data object
                SynologyError::MissingData(_) => Ok(serde_json::Value::Null),
                other => Err(other),
            })?;

        debug!("Logged out of Synology Photos");
        Ok(())
    }

    async fn session_id(&self) -> Result<String> {
        if let Some(sid) = self.sid.read().await.clone() {
            return Ok(sid);
        }

        self.login().await?;
        self.sid
            .read()
            .await
            .clone()
            .ok_or_else(|| SynologyError::MissingData("session id after login".to_string()))
    }

    async fn invalidate_session(&self) {
        *self.sid.write().await = None;
    }

    /// List up to 500 items matching `keyword` (typically an album name)
    pub async fn list_album_items(
        &self,
        keyword: &str,
        additional: &[&str],
    ) -> Result<Vec<PhotoItem>> {
        match self.try_list_album_items(keyword, additional).await {
            Err(e) if e.is_session_error() => {
                warn!(error = %e, "Session rejected, logging in again");
                self.invalidate_session().await;
                self.try_list_album_items(keyword, additional).await
            }
            other => other,
        }
    }

    async fn try_list_album_items(
        &self,
        keyword: &str,
        additional: &[&str],
    ) -> Result<Vec<PhotoItem>> {
        let sid = self.session_id().await?;
        let keyword = serde_json::to_string(keyword)?;
        let additional = serde_json::to_string(additional)?;

        let params = [
            ("api", SEARCH_API),
            ("version", "6"),
            ("method", "list_item"),
            ("keyword", keyword.as_str()),
            ("offset", "0"),
            ("limit", LIST_LIMIT),
            ("additional", additional.as_str()),
            ("_sid", sid.as_str()),
        ];

        let response = self
            .client
            .post(self.api_url(&format!("entry.cgi/{}", SEARCH_API)))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(&params))
            .send()
            .await?;

        let items: ItemList = decode_envelope(SEARCH_API, response).await?;
        debug!(count = items.list.len(), "Listed album items");
        Ok(items.list)
    }

    /// Download the optimized JPEG rendition of a photo
    pub async fn download_item(&self, cache_key: &str, unit_id: &str) -> Result<Bytes> {
        match self.try_download_item(cache_key, unit_id).await {
            Err(e) if e.is_session_error() => {
                warn!(error = %e, "Session rejected, logging in again");
                self.invalidate_session().await;
                self.try_download_item(cache_key, unit_id).await
            }
            other => other,
        }
    }

    async fn try_download_item(&self, cache_key: &str, unit_id: &str) -> Result<Bytes> {
        let sid = self.session_id().await?;
        let url = self.download_url(cache_key, unit_id, &sid)?;

        let response = self.client.get(url).send().await?.error_for_status()?;

        // Failures come back as a JSON envelope instead of image bytes
        let is_envelope = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json") || ct.starts_with("text/plain"))
            .unwrap_or(false);

        if is_envelope {
            let envelope: ApiResponse<serde_json::Value> = response.json().await?;
            let code = envelope.error.map(|e| e.code).unwrap_or(-1);
            return Err(SynologyError::Api {
                api: DOWNLOAD_API.to_string(),
                code,
            });
        }

        let data = response.bytes().await?;
        debug!(cache_key, size = data.len(), "Downloaded photo");
        Ok(data)
    }

    fn download_url(&self, cache_key: &str, unit_id: &str, sid: &str) -> Result<url::Url> {
        let unit_ids = format!("[{}]", unit_id);
        let params = [
            ("api", DOWNLOAD_API),
            ("version", "2"),
            ("method", "download"),
            ("download_type", "optimized_jpeg"),
            ("cache_key", cache_key),
            ("unit_id", unit_ids.as_str()),
            ("_sid", sid),
        ];

        url::Url::parse_with_params(&self.api_url("entry.cgi"), &params)
            .map_err(|e| SynologyError::Decode(format!("invalid download URL: {}", e)))
    }
}

/// Encode `params` as an `application/x-www-form-urlencoded` body
fn encode_form(params: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Check the HTTP status and unwrap the `{success, data, error}` envelope
async fn decode_envelope<T: DeserializeOwned>(api: &str, response: reqwest::Response) -> Result<T> {
    let response = response.error_for_status()?;
    let envelope: ApiResponse<T> = response.json().await?;

    if !envelope.success {
        let code = envelope.error.map(|e| e.code).unwrap_or(-1);
        if is_session_code(code) {
            debug!(api, code, "Session no longer valid");
        }
        return Err(SynologyError::Api {
            api: api.to_string(),
            code,
        });
    }

    envelope
        .data
        .ok_or_else(|| SynologyError::MissingData(format!("{} response had no data", api)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let client = SynologyPhotosClient::new("https://nas.local:5001/", "user", "pw");
        assert_eq!(client.base_url(), "https://nas.local:5001");
        assert_eq!(
            client.api_url("entry.cgi"),
            "https://nas.local:5001/webapi/entry.cgi"
        );
    }

    #[test]
    fn test_encode_form_escapes_values() {
        let body = encode_form(&[("keyword", "\"kitchen-dash\""), ("passwd", "p&ss word")]);
        assert_eq!(body, "keyword=%22kitchen-dash%22&passwd=p%26ss+word");
    }

    #[test]
    fn test_download_url_wraps_unit_id() {
        let client = SynologyPhotosClient::new("https://nas.local:5001", "user", "pw");
        let url = client.download_url("41_1700000000", "41", "sid-1").unwrap();

        assert_eq!(url.path(), "/webapi/entry.cgi");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("api".to_string(), "SYNO.Foto.Download".to_string())));
        assert!(pairs.contains(&("download_type".to_string(), "optimized_jpeg".to_string())));
        assert!(pairs.contains(&("cache_key".to_string(), "41_1700000000".to_string())));
        assert!(pairs.contains(&("unit_id".to_string(), "[41]".to_string())));
        assert!(pairs.contains(&("_sid".to_string(), "sid-1".to_string())));
    }

    #[test]
    fn test_insecure_client_builds() {
        let client = SynologyPhotosClient::with_options("https://192.168.1.10:5001", "u", "p", false);
        assert_eq!(client.base_url(), "https://192.168.1.10:5001");
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let client = SynologyPhotosClient::new("https://nas.invalid", "u", "p");
        assert!(client.logout().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_http_error() {
        let client = SynologyPhotosClient::new("http://127.0.0.1:9", "u", "p");
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, SynologyError::Http(_)));
    }

    mod against_mock_nas {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_string_contains, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const SEARCH_PATH: &str = "/webapi/entry.cgi/SYNO.Foto.Search.Search";

        async fn nas_with_login() -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/webapi/entry.cgi"))
                .and(body_string_contains("method=login"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"success": true, "data": {"sid": "sid-1"}})),
                )
                .mount(&server)
                .await;
            server
        }

        async fn login_count(server: &MockServer) -> usize {
            server
                .received_requests()
                .await
                .unwrap_or_default()
                .iter()
                .filter(|r| String::from_utf8_lossy(&r.body).contains("method=login"))
                .count()
        }

        fn listing() -> serde_json::Value {
            json!({
                "success": true,
                "data": {
                    "list": [{
                        "id": 41,
                        "filename": "IMG_0041.jpg",
                        "additional": {
                            "thumbnail": {"cache_key": "41_1700000000", "unit_id": 41}
                        }
                    }]
                }
            })
        }

        #[tokio::test]
        async fn test_expired_session_logs_in_again_and_retries() {
            let server = nas_with_login().await;

            // First listing is rejected, later ones succeed
            Mock::given(method("POST"))
                .and(path(SEARCH_PATH))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"success": false, "error": {"code": 119}})),
                )
                .up_to_n_times(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(SEARCH_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
                .mount(&server)
                .await;

            let client = SynologyPhotosClient::new(&server.uri(), "frame", "secret");
            let items = client
                .list_album_items("kitchen-dash", DEFAULT_ADDITIONAL)
                .await
                .unwrap();

            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id, Some(41));
            assert_eq!(login_count(&server).await, 2);
        }

        #[tokio::test]
        async fn test_non_session_error_is_not_retried() {
            let server = nas_with_login().await;
            Mock::given(method("POST"))
                .and(path(SEARCH_PATH))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"success": false, "error": {"code": 400}})),
                )
                .mount(&server)
                .await;

            let client = SynologyPhotosClient::new(&server.uri(), "frame", "secret");
            let err = client
                .list_album_items("kitchen-dash", DEFAULT_ADDITIONAL)
                .await
                .unwrap_err();

            assert!(matches!(err, SynologyError::Api { code: 400, .. }));
            assert_eq!(login_count(&server).await, 1);
        }

        #[tokio::test]
        async fn test_download_with_json_body_is_api_error() {
            let server = nas_with_login().await;
            Mock::given(method("GET"))
                .and(path("/webapi/entry.cgi"))
                .and(query_param("api", "SYNO.Foto.Download"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(
                        r#"{"success":false,"error":{"code":120}}"#,
                        "application/json",
                    ),
                )
                .mount(&server)
                .await;

            let client = SynologyPhotosClient::new(&server.uri(), "frame", "secret");
            let err = client.download_item("41_1700000000", "41").await.unwrap_err();

            match err {
                SynologyError::Api { api, code } => {
                    assert_eq!(api, "SYNO.Foto.Download");
                    assert_eq!(code, 120);
                }
                other => panic!("expected API error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_download_returns_image_bytes() {
            let server = nas_with_login().await;
            let jpeg: &[u8] = b"\xff\xd8\xff\xe0 photo \xff\xd9";
            Mock::given(method("GET"))
                .and(path("/webapi/entry.cgi"))
                .and(query_param("api", "SYNO.Foto.Download"))
                .and(query_param("cache_key", "41_1700000000"))
                .and(query_param("unit_id", "[41]"))
                .and(query_param("_sid", "sid-1"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg, "image/jpeg"))
                .mount(&server)
                .await;

            let client = SynologyPhotosClient::new(&server.uri(), "frame", "secret");
            let data = client.download_item("41_1700000000", "41").await.unwrap();

            assert_eq!(&data[..], jpeg);
            assert_eq!(login_count(&server).await, 1);
        }

        #[tokio::test]
        async fn test_download_retries_after_session_expiry() {
            let server = nas_with_login().await;
            Mock::given(method("GET"))
                .and(path("/webapi/entry.cgi"))
                .and(query_param("api", "SYNO.Foto.Download"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(
                    r#"{"success":false,"error":{"code":106}}"#,
                    "application/json",
                ))
                .up_to_n_times(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/webapi/entry.cgi"))
                .and(query_param("api", "SYNO.Foto.Download"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(&b"jpeg"[..], "image/jpeg"))
                .mount(&server)
                .await;

            let client = SynologyPhotosClient::new(&server.uri(), "frame", "secret");
            let data = client.download_item("41_1700000000", "41").await.unwrap();

            assert_eq!(&data[..], b"jpeg");
            assert_eq!(login_count(&server).await, 2);
        }
    }
}

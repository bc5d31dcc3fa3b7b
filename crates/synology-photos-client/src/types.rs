//! Synology Web API response types

use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// Envelope every `entry.cgi` JSON response is wrapped in
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
}

/// Data returned by `SYNO.API.Auth` login
#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub sid: String,
}

/// Data returned by `SYNO.Foto.Search.Search` `list_item`
#[derive(Debug, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub list: Vec<PhotoItem>,
}

/// One photo in an album or search listing
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub additional: Option<ItemAdditional>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemAdditional {
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub cache_key: String,
    /// Usually a number, but echoed back to the API verbatim so it is kept raw
    pub unit_id: serde_json::Value,
}

/// Build the `cache_key -> unit_id` listing for a set of items.
///
/// `unit_id` values are returned as their JSON text so they can be passed
/// back unchanged in a download request. Items without thumbnail metadata
/// cannot be downloaded and are skipped.
pub fn parse_items(items: &[PhotoItem]) -> HashMap<String, String> {
    let mut parsed = HashMap::with_capacity(items.len());

    for item in items {
        match item.additional.as_ref().and_then(|a| a.thumbnail.as_ref()) {
            Some(thumb) => {
                parsed.insert(thumb.cache_key.clone(), thumb.unit_id.to_string());
            }
            None => {
                warn!(
                    id = ?item.id,
                    filename = item.filename.as_deref().unwrap_or("unknown"),
                    "Skipping item without thumbnail metadata"
                );
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "success": true,
        "data": {
            "list": [
                {
                    "id": 41,
                    "filename": "IMG_0041.jpg",
                    "type": "photo",
                    "additional": {
                        "resolution": {"width": 4032, "height": 3024},
                        "orientation": 1,
                        "thumbnail": {
                            "m": "ready",
                            "xl": "ready",
                            "sm": "ready",
                            "preview": "broken",
                            "cache_key": "41_1700000000",
                            "unit_id": 41
                        }
                    }
                },
                {
                    "id": 42,
                    "filename": "IMG_0042.jpg",
                    "additional": {
                        "thumbnail": {
                            "cache_key": "42_1700000100",
                            "unit_id": 42
                        }
                    }
                },
                {
                    "id": 43,
                    "filename": "broken.heic",
                    "additional": {}
                }
            ]
        }
    }"#;

    #[test]
    fn test_listing_deserialization() {
        let response: ApiResponse<ItemList> = serde_json::from_str(LISTING).unwrap();
        assert!(response.success);
        let list = response.data.unwrap().list;
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].filename.as_deref(), Some("IMG_0041.jpg"));
    }

    #[test]
    fn test_parse_items_maps_cache_key_to_unit_id() {
        let response: ApiResponse<ItemList> = serde_json::from_str(LISTING).unwrap();
        let parsed = parse_items(&response.data.unwrap().list);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["41_1700000000"], "41");
        assert_eq!(parsed["42_1700000100"], "42");
    }

    #[test]
    fn test_parse_items_keeps_string_unit_id_as_json() {
        let item: PhotoItem = serde_json::from_str(
            r#"{"additional": {"thumbnail": {"cache_key": "k", "unit_id": "u-1"}}}"#,
        )
        .unwrap();
        let parsed = parse_items(&[item]);
        assert_eq!(parsed["k"], "\"u-1\"");
    }

    #[test]
    fn test_parse_items_empty() {
        assert!(parse_items(&[]).is_empty());
    }

    #[test]
    fn test_error_envelope_deserialization() {
        let response: ApiResponse<ItemList> =
            serde_json::from_str(r#"{"success": false, "error": {"code": 119}}"#).unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.unwrap().code, 119);
    }

    #[test]
    fn test_login_data_deserialization() {
        let response: ApiResponse<LoginData> = serde_json::from_str(
            r#"{"success": true, "data": {"sid": "abc123", "did": "xyz"}}"#,
        )
        .unwrap();
        assert_eq!(response.data.unwrap().sid, "abc123");
    }
}

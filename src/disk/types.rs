//! Yandex Disk REST API response types
//!
//! Reference: https://yandex.ru/dev/disk-api/doc/ru/reference/meta

use serde::{Deserialize, Serialize};

/// File or directory metadata (`GET /resources`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    /// Full path, `disk:/...`
    pub path: String,
    /// "dir" or "file"
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    /// Direct download URL, files only
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    /// Directory contents page, directories only
    #[serde(default, rename = "_embedded", skip_serializing)]
    pub embedded: Option<ResourceList>,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.resource_type == "dir"
    }
}

/// One page of a directory (`_embedded`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Pre-signed link (`/resources/download`, `/resources/upload`, create/delete)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub templated: Option<bool>,
}

/// Error body returned with 4xx/5xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

/// Directory page as served by the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub items: Vec<Resource>,
    pub limit: u32,
    pub offset: u32,
    pub total: Option<u32>,
}

impl DirectoryListing {
    pub fn from_resource(resource: Resource, limit: u32, offset: u32) -> Self {
        let embedded = resource.embedded;
        Self {
            path: resource.path,
            total: embedded.as_ref().and_then(|e| e.total),
            limit: embedded.as_ref().and_then(|e| e.limit).unwrap_or(limit),
            offset: embedded.as_ref().and_then(|e| e.offset).unwrap_or(offset),
            items: embedded.map(|e| e.items).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_resource() {
        let json = r#"{
            "name": "Документы",
            "path": "disk:/Документы",
            "type": "dir",
            "created": "2024-07-01T10:00:00+00:00",
            "_embedded": {
                "items": [
                    {"name": "акт.docx", "path": "disk:/Документы/акт.docx", "type": "file",
                     "size": 12345, "mime_type": "application/vnd.openxmlformats-officedocument.wordprocessingml.document"}
                ],
                "limit": 20, "offset": 0, "total": 1, "path": "disk:/Документы"
            }
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert!(resource.is_dir());

        let listing = DirectoryListing::from_resource(resource, 100, 0);
        assert_eq!(listing.path, "disk:/Документы");
        assert_eq!(listing.limit, 20);
        assert_eq!(listing.total, Some(1));
        assert_eq!(listing.items[0].size, Some(12345));
        assert!(!listing.items[0].is_dir());
    }

    #[test]
    fn test_file_resource_lists_nothing() {
        let json = r#"{"name": "a.txt", "path": "disk:/a.txt", "type": "file", "size": 3}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        let listing = DirectoryListing::from_resource(resource, 50, 10);
        assert!(listing.items.is_empty());
        assert_eq!((listing.limit, listing.offset, listing.total), (50, 10, None));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize)]
pub(super) struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ShareRequest<'a> {
    pub username: &'a str,
    pub filename: &'a str,
    pub share_with: &'a str,
}

#[derive(Deserialize)]
pub(super) struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Deserialize)]
pub(super) struct RetrieveResponse {
    files: Option<Vec<serde_json::Value>>,
}

impl RetrieveResponse {
    /// Readable entries of the listing. An entry that does not parse is
    /// logged and skipped so the rest of the listing still shows.
    pub fn into_files(self) -> Vec<StoredFile> {
        self.files
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<ListingEntry>(entry) {
                Ok(entry) => entry.into_stored_file(),
                Err(e) => {
                    warn!("Skipping unreadable listing entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingEntry {
    file_name: Option<String>,
    #[serde(rename = "filename")]
    legacy_name: Option<String>,
    #[serde(default)]
    size: u64,
    last_modified: DateTime<Utc>,
    #[serde(default)]
    download_url: String,
}

impl ListingEntry {
    fn into_stored_file(self) -> Option<StoredFile> {
        let Some(file_name) = self.file_name.or(self.legacy_name).filter(|n| !n.is_empty()) else {
            warn!("Skipping listing entry without a file name");
            return None;
        };
        Some(StoredFile {
            file_name,
            size: self.size,
            last_modified: self.last_modified,
            download_url: self.download_url,
        })
    }
}

/// One entry of the stored-file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub file_name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub download_url: String,
}

/// Files whose name contains `term`, ignoring case. An empty term keeps everything.
pub fn filter_files<'a>(files: &'a [StoredFile], term: &str) -> Vec<&'a StoredFile> {
    let term = term.trim().to_lowercase();
    files
        .iter()
        .filter(|f| term.is_empty() || f.file_name.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str) -> StoredFile {
        StoredFile {
            file_name: name.to_string(),
            size: 1,
            last_modified: Utc::now(),
            download_url: format!("https://bucket.example.com/{}", name),
        }
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let files = vec![
            stored("document1.pdf"),
            stored("presentation.pptx"),
            stored("Spreadsheet.xlsx"),
        ];

        let names = |term: &str| -> Vec<String> {
            filter_files(&files, term)
                .into_iter()
                .map(|f| f.file_name.clone())
                .collect()
        };

        assert_eq!(names("SHEET"), vec!["Spreadsheet.xlsx"]);
        assert_eq!(names(".p"), vec!["document1.pdf", "presentation.pptx"]);
        assert_eq!(names("  "), vec!["document1.pdf", "presentation.pptx", "Spreadsheet.xlsx"]);
        assert!(names("zip").is_empty());
    }

    #[test]
    fn error_body_prefers_message_then_error() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"a","error":"b"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("a"));
        let body: ErrorBody = serde_json::from_str(r#"{"error":"b"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("b"));
        let body: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }

    #[test]
    fn listing_skips_unreadable_entries() {
        let response: RetrieveResponse = serde_json::from_str(
            r#"{"files":[
                {"fileName":"a.pdf","filename":"a.pdf","size":3,"lastModified":"2024-03-01T10:15:00Z","downloadUrl":"u"},
                {"fileName":"b.pdf","size":1,"lastModified":"yesterday","downloadUrl":"u"},
                {"size":1,"lastModified":"2024-03-01T10:15:00Z"},
                {"filename":"c.txt","lastModified":"2024-03-02T08:00:00.000Z"}
            ]}"#,
        )
        .unwrap();

        let files = response.into_files();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.txt"]);
        assert_eq!(files[0].size, 3);
        assert_eq!(files[1].size, 0);
    }
}

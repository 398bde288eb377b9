use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except the characters a URI component may carry literally.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a write destination is obtained for each accepted file.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStrategy {
    /// Ask the metadata API for a time-limited upload URL.
    Indirect { api_base: String },
    /// Write straight to `bucket_base/<filename>`. No per-identity namespace,
    /// so identical names from different identities overwrite each other.
    Direct { bucket_base: String },
}

impl UploadStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            UploadStrategy::Indirect { .. } => "indirect",
            UploadStrategy::Direct { .. } => "direct",
        }
    }
}

pub fn bucket_object_url(bucket_base: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        bucket_base.trim_end_matches('/'),
        utf8_percent_encode(file_name, URI_COMPONENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_url_encodes_like_a_uri_component() {
        assert_eq!(
            bucket_object_url("https://bucket.example.com/", "Q1 report (final).pdf"),
            "https://bucket.example.com/Q1%20report%20(final).pdf"
        );
        assert_eq!(
            bucket_object_url("https://bucket.example.com", "a/b?c#d&e.txt"),
            "https://bucket.example.com/a%2Fb%3Fc%23d%26e.txt"
        );
        assert_eq!(
            bucket_object_url("https://bucket.example.com", "résumé.docx"),
            "https://bucket.example.com/r%C3%A9sum%C3%A9.docx"
        );
    }
}

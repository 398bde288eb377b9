//! Client for the DocVault account and file metadata endpoints.
//!
//! Uploads go through [`crate::upload::UploadCoordinator`]; this module covers
//! everything else the pages talk to: sign-in, sign-up, listing and sharing.

mod types;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use types::{filter_files, StoredFile};
use types::{Credentials, ErrorBody, RetrieveResponse, ShareRequest};

/// Failure of a page-level API call. The message is shown to the user as is.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Rejected(message) | ApiError::Transport(message) => message,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    api_base: String,
    auth_base: String,
}

impl ApiClient {
    pub fn new(client: Client, api_base: impl Into<String>, auth_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth_base: auth_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/signin", self.auth_base);
        self.post_for_status(&url, &Credentials { username, password }, "Login failed", "Login error")
            .await
    }

    pub async fn sign_up(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/signup", self.auth_base);
        self.post_for_status(&url, &Credentials { username, password }, "Signup failed", "Signup error")
            .await
    }

    /// Lists the files stored for `identity`.
    pub async fn retrieve_files(&self, identity: &str) -> Result<Vec<StoredFile>, ApiError> {
        const FAILURE: &str = "Failed to load files.";

        let url = format!("{}/retrieve", self.api_base);
        let response: RetrieveResponse = self
            .get_json(&url, &[("username", identity)])
            .await
            .map_err(|e| {
                warn!("Retrieve for '{}' failed: {}", identity, e);
                ApiError::Transport(FAILURE.to_string())
            })?;

        Ok(response.into_files())
    }

    pub async fn share_file(&self, owner: &str, filename: &str, recipient: &str) -> Result<(), ApiError> {
        let url = format!("{}/share", self.api_base);
        let request = ShareRequest {
            username: owner,
            filename,
            share_with: recipient,
        };
        self.post_for_status(&url, &request, "Share failed", "Share error").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, reqwest::Error> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }

    /// POSTs `body` and maps a non-success answer to the server's message, or
    /// `rejected` when it gave none. Transport failures map to `transport`.
    async fn post_for_status<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        rejected: &str,
        transport: &str,
    ) -> Result<(), ApiError> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            ApiError::Transport(transport.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| rejected.to_string());
        debug!("{} answered {}: {}", url, status, message);
        Err(ApiError::Rejected(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> ApiClient {
        ApiClient::new(Client::new(), server.url(), format!("{}/auth/", server.url()))
    }

    #[tokio::test]
    async fn sign_in_posts_credentials() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/signin")
            .match_body(Matcher::Json(json!({ "username": "alice", "password": "s3cret" })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(&server).sign_in("alice", "s3cret").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sign_in_propagates_server_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/signin")
            .with_status(401)
            .with_body(json!({ "message": "Invalid password" }).to_string())
            .create_async()
            .await;

        let err = client(&server).sign_in("alice", "wrong").await.unwrap_err();
        assert_eq!(err, ApiError::Rejected("Invalid password".into()));
    }

    #[tokio::test]
    async fn sign_up_falls_back_to_generic_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/signup")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let err = client(&server).sign_up("bob", "pw").await.unwrap_err();
        assert_eq!(err.message(), "Signup failed");
    }

    #[tokio::test]
    async fn unreachable_auth_is_a_transport_error() {
        let api = ApiClient::new(Client::new(), "http://127.0.0.1:1", "http://127.0.0.1:1");
        let err = api.sign_in("alice", "pw").await.unwrap_err();
        assert_eq!(err, ApiError::Transport("Login error".into()));
    }

    #[tokio::test]
    async fn retrieve_parses_wrapped_listing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/retrieve")
            .match_query(Matcher::UrlEncoded("username".into(), "alice".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "files": [
                        {
                            "fileName": "report.pdf",
                            "size": 2048,
                            "lastModified": "2024-03-01T10:15:00Z",
                            "downloadUrl": "https://bucket.example.com/report.pdf?sig=abc"
                        },
                        {
                            "filename": "notes.txt",
                            "size": 12,
                            "lastModified": "2024-03-02T08:00:00.000Z",
                            "downloadUrl": "https://bucket.example.com/notes.txt"
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let files = client(&server).retrieve_files("alice").await.unwrap();
        mock.assert_async().await;

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "report.pdf");
        assert_eq!(files[0].size, 2048);
        assert_eq!(files[0].last_modified.to_rfc3339(), "2024-03-01T10:15:00+00:00");
        assert_eq!(files[1].file_name, "notes.txt");
    }

    #[tokio::test]
    async fn retrieve_without_files_field_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/retrieve")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let files = client(&server).retrieve_files("alice").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn retrieve_failure_has_fixed_message() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/retrieve")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server).retrieve_files("alice").await.unwrap_err();
        assert_eq!(err.message(), "Failed to load files.");
    }

    #[tokio::test]
    async fn share_posts_recipient_and_reads_error_field() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/share")
            .match_body(Matcher::Json(json!({
                "username": "alice",
                "filename": "report.pdf",
                "shareWith": "bob"
            })))
            .with_status(404)
            .with_body(json!({ "error": "User bob not found" }).to_string())
            .create_async()
            .await;

        let err = client(&server)
            .share_file("alice", "report.pdf", "bob")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "User bob not found");
    }
}

//! Firebase backend over the public REST APIs.
//!
//! Reports go to Cloud Firestore (`documents/{collection}` for creates,
//! `documents:runQuery` for the ordered listing) and media to Firebase
//! Storage (`/b/{bucket}/o`). Requests carry the project's web API key;
//! access control is whatever the project's security rules allow.

pub mod codec;
mod firestore;
mod storage;

use std::sync::Arc;

use reqwest::{Client, Response};
use serde_json::Value;

use crate::config::FirebaseConfig;
use crate::error::Result;

pub use firestore::FirestoreDocuments;
pub use storage::FirebaseStorage;

/// Shared HTTP client and project settings.
#[derive(Debug, Clone)]
pub struct FirebaseClient {
    http: Client,
    config: Arc<FirebaseConfig>,
}

impl FirebaseClient {
    /// Build a client for the given project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("sosreport/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config.clone()),
        })
    }

    /// Project settings.
    #[must_use]
    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// The underlying HTTP client.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Append the API key query parameter, if one is configured.
    #[must_use]
    pub fn with_key(&self, url: String) -> String {
        if self.config.api_key.is_empty() {
            return url;
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{url}{separator}key={}",
            urlencoding::encode(&self.config.api_key)
        )
    }
}

/// Read a response body as JSON, turning non-success statuses into the
/// service's own error message.
async fn json_or_message(response: Response) -> std::result::Result<Value, String> {
    let status = response.status();
    let text = response.text().await.map_err(|err| err.to_string())?;
    if status.is_success() {
        serde_json::from_str(&text).map_err(|err| err.to_string())
    } else {
        Err(error_message(status.as_u16(), &text))
    }
}

/// Extract `error.message` from a Google API error body.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}: {}", body.trim()))
}

#[cfg(test)]
mod canned {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::FirebaseClient;
    use crate::config::FirebaseConfig;

    /// Local HTTP server that answers every request with one fixed response.
    pub struct CannedServer {
        pub base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        pub async fn start(status: u16, body: &str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind listener");
            let addr = listener.local_addr().expect("addr");
            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );

            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let request = read_request(&mut stream).await;
                    seen.lock().unwrap().push(request);
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self {
                base: format!("http://{addr}"),
                requests,
            }
        }

        /// Raw text of every request received so far.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        /// A client for project `sos-app` whose endpoints point here.
        pub fn client(&self) -> FirebaseClient {
            let config = FirebaseConfig {
                project_id: "sos-app".to_string(),
                api_key: "k".to_string(),
                storage_bucket: "sos-app.appspot.com".to_string(),
                firestore_endpoint: self.base.clone(),
                storage_endpoint: self.base.clone(),
                ..FirebaseConfig::default()
            };
            FirebaseClient {
                http: reqwest::Client::builder().no_proxy().build().unwrap(),
                config: Arc::new(config),
            }
        }
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..end]).to_string();
            let length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }
}

//! `reqwest`-backed project fetcher.

use std::time::Duration;

use scratch_top_models::{FetchOutcome, Record};

use crate::{FetchError, Fetcher, parse_project};

/// Project endpoint of the public Scratch API. `{id}` is replaced with the
/// project ID.
pub const DEFAULT_URL_TEMPLATE: &str = "https://api.scratch.mit.edu/projects/{id}";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches projects over HTTP, one GET per ID, with no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client, url_template))
    }

    /// Wraps an existing client. The client's own timeout settings apply.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url_template: &str) -> Self {
        Self {
            client,
            url_template: url_template.to_owned(),
        }
    }

    /// Builds the request URL for `id`.
    #[must_use]
    pub fn url_for(&self, id: u64) -> String {
        self.url_template.replace("{id}", &id.to_string())
    }

    async fn try_fetch(&self, id: u64) -> Result<Record, FetchError> {
        let response = self.client.get(self.url_for(id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: serde_json::Value = response.json().await?;
        parse_project(id, &body)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: u64) -> FetchOutcome {
        match self.try_fetch(id).await {
            Ok(record) => FetchOutcome::Present(record),
            Err(FetchError::Status(status)) => {
                log::trace!("Project {id}: {status}");
                FetchOutcome::Absent
            }
            Err(e) => {
                log::debug!("Project {id} absent: {e}");
                FetchOutcome::Absent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves canned responses keyed by request path until the test ends.
    async fn serve(route: fn(&str) -> Option<(u16, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let request = String::from_utf8_lossy(&buf);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_owned();

                    let Some((status, body)) = route(&path) else {
                        // Never answer; the client must time out.
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    };

                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}/projects/{{id}}")
    }

    fn scratch_api(path: &str) -> Option<(u16, String)> {
        match path {
            "/projects/1" => Some((
                200,
                serde_json::json!({
                    "id": 1,
                    "title": "Scratch Cat Dance",
                    "author": { "username": "cat_fan" },
                    "stats": { "views": 4_200 }
                })
                .to_string(),
            )),
            "/projects/2" => Some((404, r#"{"code":"NotFound","message":""}"#.to_owned())),
            "/projects/3" => Some((200, "{ not json".to_owned())),
            "/projects/4" => None,
            "/projects/5" => Some((200, r#"{"title":"no author"}"#.to_owned())),
            _ => Some((500, String::new())),
        }
    }

    #[test]
    fn substitutes_id_into_template() {
        let fetcher = HttpFetcher::new(DEFAULT_URL_TEMPLATE, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            fetcher.url_for(104),
            "https://api.scratch.mit.edu/projects/104"
        );
    }

    #[tokio::test]
    async fn fetches_present_project() {
        let template = serve(scratch_api).await;
        let fetcher = HttpFetcher::new(&template, Duration::from_secs(5)).unwrap();

        let outcome = fetcher.fetch(1).await;
        assert_eq!(
            outcome,
            FetchOutcome::Present(Record {
                id: 1,
                title: "Scratch Cat Dance".to_owned(),
                creator: "cat_fan".to_owned(),
                views: 4_200,
            })
        );
    }

    #[tokio::test]
    async fn maps_failures_to_absent() {
        let template = serve(scratch_api).await;
        let fetcher = HttpFetcher::new(&template, Duration::from_millis(300)).unwrap();

        // 404, malformed body, timeout, missing fields, 500
        for id in [2, 3, 4, 5, 6] {
            assert_eq!(fetcher.fetch(id).await, FetchOutcome::Absent, "id {id}");
        }
    }

    #[tokio::test]
    async fn maps_connection_failure_to_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(
            &format!("http://{addr}/projects/{{id}}"),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(fetcher.fetch(1).await, FetchOutcome::Absent);
    }
}

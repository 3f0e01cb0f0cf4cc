//! Resilient JSON fetching over HTTP.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, Method, StatusCode,
};
use serde_json::Value;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("textmap/", env!("CARGO_PKG_VERSION"));
const BODY_EXCERPT_CHARS: usize = 512;

/// Fixed-interval retry budget applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(3),
        }
    }
}

/// Why a single attempt failed. Every variant is retried.
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    /// The request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a status >= 400.
    #[error("HTTP {0}")]
    Status(StatusCode),
}

/// Errors surfaced by [`Fetcher`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The configured token is not a valid header value.
    #[error("invalid authorization token")]
    Token,

    /// Every attempt failed.
    #[error("giving up on {url} after {attempts} attempts: {last_failure}")]
    Exhausted {
        /// Requested URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last_failure: AttemptFailure,
    },

    /// A successful response did not contain valid JSON.
    #[error("failed to parse response from {url} (HTTP {status}): {source}; body: {body}")]
    Parse {
        /// Response status.
        status: StatusCode,
        /// Requested URL.
        url: String,
        /// Leading part of the body.
        body: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
struct BearerAuth {
    scope: String,
    value: HeaderValue,
}

impl BearerAuth {
    fn applies_to(&self, url: &str) -> bool {
        url.strip_prefix(&self.scope)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }
}

/// HTTP client that retries failed requests and decodes bodies as JSON.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: Client,
    policy: RetryPolicy,
    auth: Option<BearerAuth>,
}

impl Fetcher {
    /// Build a fetcher with the given retry policy and per-request timeout.
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
            auth: None,
        })
    }

    /// Send `token` as a bearer token on requests to URLs under `scope`.
    ///
    /// Requests to any other host or path go out without it.
    pub fn with_bearer(mut self, scope: &str, token: &str) -> Result<Self, FetchError> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| FetchError::Token)?;
        value.set_sensitive(true);
        self.auth = Some(BearerAuth {
            scope: scope.trim_end_matches('/').to_string(),
            value,
        });
        Ok(self)
    }

    /// `GET` a URL and decode the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.request_json(Method::GET, url, &HeaderMap::new(), None)
            .await
    }

    /// Issue a request, retrying on transport errors and HTTP statuses >= 400.
    ///
    /// The whole body is read before decoding. A body that is not valid JSON
    /// is not retried.
    pub async fn request_json(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> Result<Value, FetchError> {
        let mut attempt = 1;
        loop {
            match self.attempt(method.clone(), url, headers, body).await {
                Ok((status, bytes)) => {
                    debug!(url, %status, bytes = bytes.len(), "fetched");
                    return decode(status, url, &bytes);
                }
                Err(failure) => {
                    warn!(
                        url,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        %failure,
                        "request failed"
                    );
                    if attempt >= self.policy.max_attempts {
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last_failure: failure,
                        });
                    }
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> Result<(StatusCode, Vec<u8>), AttemptFailure> {
        let mut request = self.http.request(method, url).headers(headers.clone());
        if let Some(auth) = self.auth.as_ref().filter(|auth| auth.applies_to(url)) {
            request = request.header(AUTHORIZATION, auth.value.clone());
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let mut response = request.send().await.map_err(AttemptFailure::Transport)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AttemptFailure::Status(status));
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(AttemptFailure::Transport)? {
            data.extend_from_slice(&chunk);
        }
        Ok((status, data))
    }
}

fn decode(status: StatusCode, url: &str, bytes: &[u8]) -> Result<Value, FetchError> {
    serde_json::from_slice(bytes).map_err(|source| FetchError::Parse {
        status,
        url: url.to_string(),
        body: String::from_utf8_lossy(bytes)
            .chars()
            .take(BODY_EXCERPT_CHARS)
            .collect(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_attempts: u32) -> Fetcher {
        Fetcher::new(
            RetryPolicy {
                max_attempts,
                delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn gives_up_after_exactly_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let url = format!("{}/broken", server.uri());
        let err = fetcher(4).get_json(&url).await.unwrap_err();
        match err {
            FetchError::Exhausted {
                url: failed,
                attempts,
                last_failure,
            } => {
                assert_eq!(failed, url);
                assert_eq!(attempts, 4);
                assert!(matches!(
                    last_failure,
                    AttemptFailure::Status(StatusCode::SERVICE_UNAVAILABLE)
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.verify().await;
    }

    #[tokio::test]
    async fn connection_errors_use_the_same_budget() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = fetcher(3)
            .get_json(&format!("http://127.0.0.1:{port}/closed"))
            .await
            .unwrap_err();
        match err {
            FetchError::Exhausted {
                attempts,
                last_failure,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last_failure, AttemptFailure::Transport(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn token_is_only_sent_under_its_scope() {
        let api = MockServer::start().await;
        let files = MockServer::start().await;
        for server in [&api, &files] {
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(server)
                .await;
        }

        let fetcher = fetcher(1).with_bearer(&format!("{}/", api.uri()), "t0ken").unwrap();
        fetcher
            .get_json(&format!("{}/repos/owner/data/commits", api.uri()))
            .await
            .unwrap();
        fetcher
            .get_json(&format!("{}/TextMapEN.json", files.uri()))
            .await
            .unwrap();

        let api_requests = api.received_requests().await.unwrap();
        assert_eq!(
            api_requests[0].headers.get("authorization").unwrap(),
            "Bearer t0ken"
        );
        let file_requests = files.received_requests().await.unwrap();
        assert!(!file_requests[0].headers.contains_key("authorization"));
    }

    #[test]
    fn scope_matches_whole_path_segments() {
        let auth = BearerAuth {
            scope: "https://api.github.com".to_string(),
            value: HeaderValue::from_static("Bearer x"),
        };
        assert!(auth.applies_to("https://api.github.com/repos/a/b/commits"));
        assert!(auth.applies_to("https://api.github.com?x=1"));
        assert!(!auth.applies_to("https://api.github.com.evil.net/repos"));
        assert!(!auth.applies_to("https://raw.githubusercontent.com/a/b"));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let value = fetcher(10)
            .get_json(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn parse_failure_is_not_retried_and_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(5)
            .get_json(&format!("{}/garbage", server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::Parse { status, body, .. } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, "<html>oops</html>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn reads_bodies_spanning_many_chunks() {
        let server = MockServer::start().await;
        let big: Vec<Value> = (0..50_000)
            .map(|id| json!({"id": id, "icon": format!("UI_Icon_{id}")}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/big.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(big)))
            .mount(&server)
            .await;

        let value = fetcher(1)
            .get_json(&format!("{}/big.json", server.uri()))
            .await
            .unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 50_000);
        assert_eq!(items[49_999]["icon"], json!("UI_Icon_49999"));
    }

    #[tokio::test]
    async fn forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-trace", "abc"))
            .and(body_string("{\"q\":1}"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([1, 2])))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        let value = fetcher(1)
            .request_json(
                Method::POST,
                &format!("{}/echo", server.uri()),
                &headers,
                Some("{\"q\":1}"),
            )
            .await
            .unwrap();
        assert_eq!(value, json!([1, 2]));
    }
}

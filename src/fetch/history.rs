use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::COOKIE, Client, StatusCode, Url};

use crate::error::{AppError, Context};

use super::{CredentialProvider, FetchResult};

/// Downloads the raw history table behind a built URL.
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult<String>;
}

/// HTTP implementation carrying the provider's session cookie.
pub struct HttpFetcher {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, credentials: Arc<dyn CredentialProvider>) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct history HTTP client")?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl HistoryFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<String> {
        let mut request = self.client.get(url.clone());

        let cookie = self.credentials.cookie();
        if url.host_str().is_some_and(|host| cookie.matches_host(host)) {
            request = request.header(COOKIE, cookie.header_value());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            log::debug!(
                "History download {} answered {} with {} bytes",
                url.path(),
                status,
                body.len()
            );
            return Err(AppError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{SessionCookie, StaticCredentials};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TABLE: &str = "Date,Open,High,Low,Close,Adj Close,Volume\n2018-01-01,86.13,96.07,85.50,95.01,91.82,574258400\n";

    fn fetcher(cookie_domain: &str) -> HttpFetcher {
        let credentials = StaticCredentials::new(
            "crumb",
            SessionCookie {
                name: "B".to_string(),
                value: "session".to_string(),
                domain: cookie_domain.to_string(),
            },
        );
        HttpFetcher::new(Duration::from_secs(10), Arc::new(credentials)).unwrap()
    }

    fn url(server: &MockServer, suffix: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), suffix)).unwrap()
    }

    #[tokio::test]
    async fn returns_body_and_sends_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/MSFT"))
            .and(header("cookie", "B=session"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher("127.0.0.1")
            .fetch(&url(&server, "/download/MSFT?interval=1mo"))
            .await
            .expect("fetch succeeds");

        assert_eq!(body, TABLE);
    }

    #[tokio::test]
    async fn omits_cookie_for_foreign_host() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE))
            .mount(&server)
            .await;

        fetcher(".yahoo.com")
            .fetch(&url(&server, "/download/MSFT"))
            .await
            .expect("fetch succeeds");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("cookie").is_none());
    }

    #[tokio::test]
    async fn non_200_embeds_body_in_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"finance":{"error":{"code":"Unauthorized"}}}"#),
            )
            .mount(&server)
            .await;

        let err = fetcher("127.0.0.1")
            .fetch(&url(&server, "/download/MSFT"))
            .await
            .expect_err("401 must fail");

        match err {
            AppError::Fetch { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unauthorized"), "{body}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

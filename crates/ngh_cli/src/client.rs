//! Blocking HTTP client for the GitHub adapter.

use crate::config::Identity;
use ngh_sync_engine::{HttpClient, HttpResponse, Method};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

const API_ACCEPT: &str = "application/vnd.github.v3+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// [`HttpClient`] over `reqwest`, authenticating every request.
pub struct ReqwestClient {
    client: Client,
    user: String,
    token: String,
}

impl ReqwestClient {
    /// Builds a client for `identity`.
    pub fn new(identity: &Identity) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ngh/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            user: identity.user.clone(),
            token: identity.token.clone(),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, method: Method, url: &str, body: Option<&str>) -> Result<HttpResponse, String> {
        debug!(%method, url, "request");
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.user, Some(&self.token));
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| e.to_string())?;
        debug!(status, bytes = text.len(), "response");
        Ok(HttpResponse::new(status, text))
    }
}

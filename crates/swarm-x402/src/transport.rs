//! Minimal request/response model the payment flow runs over.
//!
//! [`X402Client`](crate::X402Client) replays a request after paying, so it needs
//! an owned, cloneable request rather than a one-shot `reqwest::RequestBuilder`.

use std::future::Future;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::X402Error;

/// An owned HTTP request that can be sent more than once.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header. Invalid names or values are reported, not dropped.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, X402Error> {
        self.set_header(name, value)?;
        Ok(self)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), X402Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| X402Error::HttpError(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| X402Error::HttpError(format!("invalid value for header '{name}': {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with the matching content type.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, X402Error> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, X402Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends one request and reads the whole response. Implementations must not
/// follow redirects: a redirect would carry the payment header to another host.
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, X402Error>> + Send;
}

impl HttpTransport for reqwest::Client {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, X402Error> {
        let url = request.url.clone();
        let mut builder = self
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| X402Error::HttpError(format!("{url}: {e}")))?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| X402Error::HttpError(format!("{url}: failed to read body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

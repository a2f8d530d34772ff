// ===============================
// src/http.rs
// ===============================
//
// Typed JSON client for the POS backend.
// - every call: build url -> send -> status -> body text -> decode
// - 204 / empty body decodes to `None` (callers that expect a body get Parse)
// - bearer token is shared between clones, so a login updates every repository
//
use std::sync::{Arc, RwLock};
use std::time::Instant;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{ApiError, Result};
use crate::metrics::{route_label, HTTP_LATENCY, HTTP_REQUESTS};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // trailing slash so `join` keeps any path prefix of the base
        let mut base = Url::parse(base_url.trim_end_matches('/'))?;
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Raw reqwest client (no auth), used for presigned uploads.
    pub fn raw(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        let rb = self.http.request(method, url);
        Ok(match self.token() {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let rb = self.request(Method::GET, path)?;
        required(self.execute(rb, Method::GET, path).await?)
    }

    /// GET where "no content" is a valid answer.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let rb = self.request(Method::GET, path)?;
        self.execute(rb, Method::GET, path).await
    }

    /// Query GET where "no content" is a valid answer.
    pub async fn get_query_optional<T, Q>(&self, path: &str, query: &Q) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let rb = self.request(Method::GET, path)?.query(query);
        self.execute(rb, Method::GET, path).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let rb = self.request(Method::POST, path)?.json(body);
        required(self.execute(rb, Method::POST, path).await?)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let rb = self.request(Method::PUT, path)?.json(body);
        required(self.execute(rb, Method::PUT, path).await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let rb = self.request(Method::DELETE, path)?;
        self.execute::<serde_json::Value>(rb, Method::DELETE, path)
            .await
            .map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        rb: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<Option<T>> {
        let route = route_label(path);
        let started = Instant::now();
        let resp = rb.send().await;
        HTTP_LATENCY.observe(started.elapsed().as_secs_f64() * 1000.0);

        match resp {
            Ok(rsp) if rsp.status().is_success() => {
                let code = rsp.status();
                HTTP_REQUESTS
                    .with_label_values(&[method.as_str(), &route, code.as_str()])
                    .inc();
                let body = rsp.text().await.map_err(ApiError::Network)?;
                tracing::debug!(%method, %route, %code, "request ok");
                decode_body(code, &body)
            }
            Ok(rsp) => {
                let code = rsp.status();
                HTTP_REQUESTS
                    .with_label_values(&[method.as_str(), &route, code.as_str()])
                    .inc();
                let body = rsp.text().await.unwrap_or_default();
                tracing::warn!(%method, %route, %code, %body, "request failed");
                Err(ApiError::from_response(code, &body))
            }
            Err(e) => {
                HTTP_REQUESTS
                    .with_label_values(&[method.as_str(), &route, "network"])
                    .inc();
                tracing::error!(?e, %method, %route, "request send err");
                Err(ApiError::Network(e))
            }
        }
    }
}

fn decode_body<T: DeserializeOwned>(code: StatusCode, body: &str) -> Result<Option<T>> {
    if code == StatusCode::NO_CONTENT || body.trim().is_empty() || body.trim() == "null" {
        return Ok(None);
    }
    serde_json::from_str(body).map(Some).map_err(ApiError::from)
}

fn required<T>(v: Option<T>) -> Result<T> {
    v.ok_or_else(|| ApiError::Parse("empty response body".to_string()))
}

/// Encode a free-form value for use as one path segment.
pub fn segment(v: &str) -> String {
    urlencoding::encode(v).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_base_prefix() {
        let api = ApiClient::new("https://pos.example.com/backend/").unwrap();
        assert_eq!(
            api.url("/api/cashbox/open").unwrap().as_str(),
            "https://pos.example.com/backend/api/cashbox/open"
        );
        let api = ApiClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            api.url("api/stores/3").unwrap().as_str(),
            "http://localhost:8080/api/stores/3"
        );
    }

    #[test]
    fn bad_base_url_is_config_error() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::Config(_))));
    }

    #[test]
    fn empty_bodies_decode_to_none() {
        let v: Option<serde_json::Value> = decode_body(StatusCode::NO_CONTENT, "").unwrap();
        assert!(v.is_none());
        let v: Option<serde_json::Value> = decode_body(StatusCode::OK, "  ").unwrap();
        assert!(v.is_none());
        let v: Option<serde_json::Value> = decode_body(StatusCode::OK, "null").unwrap();
        assert!(v.is_none());
        let v: Option<u32> = decode_body(StatusCode::OK, "5").unwrap();
        assert_eq!(v, Some(5));
        assert!(matches!(
            decode_body::<u32>(StatusCode::OK, "{"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn token_is_shared_between_clones() {
        let api = ApiClient::new("http://localhost:8080").unwrap();
        let repo_view = api.clone();
        api.set_token(Some("abc".into()));
        assert_eq!(repo_view.token().as_deref(), Some("abc"));
        repo_view.set_token(None);
        assert_eq!(api.token(), None);
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
    }
}

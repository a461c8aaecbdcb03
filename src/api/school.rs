//! Client for the school REST API.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde_json::Value;
use tracing::debug;

use crate::api::client::HttpClient;
use crate::api::{RecordFilter, Resource};
use crate::error::ApiError;
use crate::services::record_source::RecordSource;
use crate::services::submission::{Submission, Submitter};

pub struct SchoolApi<C> {
    client: C,
    base_url: Url,
}

impl<C: HttpClient> SchoolApi<C> {
    pub fn new(client: C, base_url: &str) -> Result<Self, ApiError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn list_url(&self, resource: Resource, filter: &RecordFilter) -> Result<Url, ApiError> {
        let mut url = self.url(resource.path())?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// GETs a list endpoint and returns the raw JSON body.
    #[tracing::instrument(skip(self, filter), fields(resource = %resource))]
    pub async fn get_list(&self, resource: Resource, filter: &RecordFilter) -> Result<Value, ApiError> {
        let req = Request::new(Method::GET, self.list_url(resource, filter)?);
        self.send(req).await
    }

    /// POSTs a JSON body to `path`.
    #[tracing::instrument(skip(self, body))]
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let mut req = Request::new(Method::POST, self.url(path)?);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(serde_json::to_vec(body)?.into());
        self.send(req).await
    }

    async fn send(&self, req: Request) -> Result<Value, ApiError> {
        let url = req.url().clone();
        let response = self.client.execute(req).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "Response received");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl<C: HttpClient> RecordSource for SchoolApi<C> {
    async fn fetch_raw(&self, resource: Resource, filter: &RecordFilter) -> Result<Value, ApiError> {
        self.get_list(resource, filter).await
    }
}

#[async_trait]
impl<C: HttpClient> Submitter for SchoolApi<C> {
    async fn submit(&self, submission: &Submission) -> Result<Value, ApiError> {
        self.post_json(submission.path(), &submission.payload()?).await
    }
}

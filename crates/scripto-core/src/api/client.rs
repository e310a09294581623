//! HTTP client for the Scripto API

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ApiFuture, CatalogSource, RequestSource, VoteApi};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Analytics, CatalogItem, ChangeRequest, DownvoteCount, DownvoteOutcome, FulfillReceipt,
    LikeCount, NewChangeRequest, NewScript, SearchQuery, UploadReceipt, VoteChoice, VoteTally,
};

/// API client bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SetVoteBody {
    vote: VoteChoice,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. `http://localhost:8000/v1`)
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::build(base_url.into(), None)
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::build(config.api_url.clone(), config.request_timeout())
    }

    fn build(base_url: String, timeout: Option<Duration>) -> ApiResult<Self> {
        let mut builder = Client::builder().user_agent(concat!("scripto/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode a JSON body, normalizing any failure
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, label: &str) -> ApiResult<T> {
        debug!("{}", label);

        let response = request.send().await.map_err(|e| {
            warn!("{} failed: {}", label, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                warn!("{} returned an undecodable body: {}", label, e);
                ApiError::from(e)
            });
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response(status.as_u16(), &body);
        warn!("{} failed ({}): {}", label, status, error);
        Err(error)
    }

    /// Upload a script file; the server generates its metadata
    ///
    /// The upload reply only carries the new id, so the full item is fetched
    /// afterwards. Passing `request_id` fulfills that change request.
    pub async fn upload_script(
        &self,
        path: &Path,
        request_id: Option<&str>,
    ) -> ApiResult<CatalogItem> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename));
        let mut request = self.client.post(self.endpoint("upload-script/")).multipart(form);
        if let Some(request_id) = request_id {
            request = request.query(&[("request_id", request_id)]);
        }

        let receipt: UploadReceipt = self.send(request, "POST upload-script/").await?;
        debug!(
            "Uploaded {} as {}",
            receipt.filename.as_deref().unwrap_or("script"),
            receipt.id
        );
        self.get_script(&receipt.id).await
    }

    /// Submit a script entered by hand
    pub async fn input_script(&self, script: &NewScript) -> ApiResult<CatalogItem> {
        let request = self.client.post(self.endpoint("input-script/")).json(script);
        self.send(request, "POST input-script/").await
    }

    pub async fn list_scripts(&self) -> ApiResult<Vec<CatalogItem>> {
        let request = self.client.get(self.endpoint("get-all-scripts/"));
        self.send(request, "GET get-all-scripts/").await
    }

    pub async fn search_scripts(&self, query: &SearchQuery) -> ApiResult<Vec<CatalogItem>> {
        let request = self
            .client
            .get(self.endpoint("search-scripts/"))
            .query(&query.params());
        self.send(request, "GET search-scripts/").await
    }

    pub async fn get_script(&self, script_id: &str) -> ApiResult<CatalogItem> {
        let path = format!("get-script-by-id/{}/", script_id);
        let request = self.client.get(self.endpoint(&path));
        self.send(request, &format!("GET {}", path)).await
    }

    pub async fn trending_scripts(&self, limit: u32) -> ApiResult<Vec<CatalogItem>> {
        let request = self
            .client
            .get(self.endpoint("trending-scripts/"))
            .query(&[("limit", limit)]);
        self.send(request, "GET trending-scripts/").await
    }

    pub async fn recent_scripts(&self, limit: u32) -> ApiResult<Vec<CatalogItem>> {
        let request = self
            .client
            .get(self.endpoint("recent-scripts/"))
            .query(&[("limit", limit)]);
        self.send(request, "GET recent-scripts/").await
    }

    pub async fn like_script(&self, script_id: &str) -> ApiResult<LikeCount> {
        self.post_empty(&format!("like-script/{}/", script_id)).await
    }

    pub async fn unlike_script(&self, script_id: &str) -> ApiResult<LikeCount> {
        self.post_empty(&format!("unlike-script/{}/", script_id)).await
    }

    pub async fn downvote_script(&self, script_id: &str) -> ApiResult<DownvoteOutcome> {
        self.post_empty(&format!("downvote-script/{}/", script_id)).await
    }

    pub async fn undo_downvote_script(&self, script_id: &str) -> ApiResult<DownvoteCount> {
        self.post_empty(&format!("undo-downvote-script/{}/", script_id))
            .await
    }

    pub async fn set_script_vote(&self, script_id: &str, vote: VoteChoice) -> ApiResult<VoteTally> {
        let path = format!("set-vote/{}/", script_id);
        let request = self
            .client
            .put(self.endpoint(&path))
            .json(&SetVoteBody { vote });
        self.send(request, &format!("PUT {}", path)).await
    }

    pub async fn script_likes(&self, script_id: &str) -> ApiResult<LikeCount> {
        let path = format!("get-script-likes/{}/", script_id);
        let request = self.client.get(self.endpoint(&path));
        self.send(request, &format!("GET {}", path)).await
    }

    pub async fn script_downvotes(&self, script_id: &str) -> ApiResult<DownvoteCount> {
        let path = format!("get-script-downvotes/{}/", script_id);
        let request = self.client.get(self.endpoint(&path));
        self.send(request, &format!("GET {}", path)).await
    }

    pub async fn all_tags(&self) -> ApiResult<Vec<String>> {
        let request = self.client.get(self.endpoint("get-all-tags/"));
        self.send(request, "GET get-all-tags/").await
    }

    pub async fn analytics(&self) -> ApiResult<Analytics> {
        let request = self.client.get(self.endpoint("analytics/"));
        self.send(request, "GET analytics/").await
    }

    pub async fn request_script(&self, request: &NewChangeRequest) -> ApiResult<ChangeRequest> {
        let builder = self.client.post(self.endpoint("request-script/")).json(request);
        self.send(builder, "POST request-script/").await
    }

    pub async fn script_requests(&self) -> ApiResult<Vec<ChangeRequest>> {
        let request = self.client.get(self.endpoint("get-script-requests/"));
        self.send(request, "GET get-script-requests/").await
    }

    pub async fn fulfill_script_request(&self, request_id: &str) -> ApiResult<FulfillReceipt> {
        let path = format!("fulfill-script-request/{}/", request_id);
        let request = self.client.put(self.endpoint(&path));
        self.send(request, &format!("PUT {}", path)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.client.post(self.endpoint(path));
        self.send(request, &format!("POST {}", path)).await
    }
}

impl CatalogSource for ApiClient {
    fn list_scripts(&self) -> ApiFuture<'_, Vec<CatalogItem>> {
        Box::pin(ApiClient::list_scripts(self))
    }

    fn search_scripts<'a>(&'a self, query: &'a SearchQuery) -> ApiFuture<'a, Vec<CatalogItem>> {
        Box::pin(ApiClient::search_scripts(self, query))
    }
}

impl VoteApi for ApiClient {
    fn like<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(self.like_script(script_id))
    }

    fn unlike<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(self.unlike_script(script_id))
    }

    fn downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteOutcome> {
        Box::pin(self.downvote_script(script_id))
    }

    fn undo_downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount> {
        Box::pin(self.undo_downvote_script(script_id))
    }

    fn set_vote<'a>(&'a self, script_id: &'a str, vote: VoteChoice) -> ApiFuture<'a, VoteTally> {
        Box::pin(self.set_script_vote(script_id, vote))
    }

    fn likes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(self.script_likes(script_id))
    }

    fn downvotes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount> {
        Box::pin(self.script_downvotes(script_id))
    }
}

impl RequestSource for ApiClient {
    fn list_requests(&self) -> ApiFuture<'_, Vec<ChangeRequest>> {
        Box::pin(self.script_requests())
    }

    fn fulfill_request<'a>(&'a self, request_id: &'a str) -> ApiFuture<'a, FulfillReceipt> {
        Box::pin(self.fulfill_script_request(request_id))
    }
}

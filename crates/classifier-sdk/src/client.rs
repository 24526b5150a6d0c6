use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ApiError, ApiResult, ErrorDetail};
use crate::executor::RequestExecutor;
use crate::model::{
    FeedbackRequest, HealthStatus, HistoryPage, PredictRequest, PredictionId, PredictionRecord,
    RawHealth, RawHistory, RawPrediction, RawSegmentation, SegmentRequest, SegmentationResult,
};

/// Backend operations the engine depends on.
///
/// [`ClassifierClient`] is the HTTP implementation; components only see this
/// trait so they can be driven by any backend.
#[async_trait]
pub trait ClassifierApi: Send + Sync {
    async fn predict(&self, text: &str) -> ApiResult<PredictionRecord>;
    async fn send_feedback(&self, id: &PredictionId, liked: bool) -> ApiResult<()>;
    async fn segment(&self, text: &str, max_words: usize) -> ApiResult<SegmentationResult>;
    async fn predictions(&self, page: u32, limit: u32) -> ApiResult<HistoryPage>;
    async fn health(&self) -> ApiResult<HealthStatus>;
}

/// JSON-over-HTTP client for the classifier backend.
#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: Url,
    executor: RequestExecutor,
}

impl ClassifierClient {
    pub fn new(base_url: Url, executor: RequestExecutor) -> Self {
        Self {
            http: Client::new(),
            base_url: with_trailing_slash(base_url),
            executor,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.base_url()?,
            RequestExecutor::new(config.retry_policy()),
        ))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::MalformedResponse(format!("invalid endpoint {path}: {err}")))
    }

    /// Sends the request built by `build` through the executor and returns the
    /// body of the first successful response.
    async fn send<B>(&self, operation: &'static str, build: B) -> ApiResult<String>
    where
        B: Fn(&Client) -> RequestBuilder,
    {
        self.executor
            .execute(operation, || {
                let request = build(&self.http).header("Accept", "application/json");
                async move {
                    let response = request.send().await.map_err(ApiError::from_transport)?;
                    let status = response.status();
                    let body = response.text().await.map_err(ApiError::from_transport)?;
                    classify_status(status, body)
                }
            })
            .await
    }
}

fn classify_status(status: StatusCode, body: String) -> ApiResult<String> {
    if status.is_success() {
        Ok(body)
    } else if status.is_server_error() {
        Err(ApiError::ServerError { status, body })
    } else if status.is_client_error() {
        Err(ApiError::ClientError {
            status,
            detail: ErrorDetail::from_body(&body),
        })
    } else {
        Err(ApiError::MalformedResponse(format!(
            "unexpected status {status}"
        )))
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|err| {
        debug!(target: "classifier.client", operation, error = %err, "failed to decode response");
        ApiError::MalformedResponse(format!("{operation}: {err}"))
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ClassifierApi for ClassifierClient {
    async fn predict(&self, text: &str) -> ApiResult<PredictionRecord> {
        let url = self.endpoint("predict")?;
        let body = self
            .send("predict", |http| {
                http.post(url.clone()).json(&PredictRequest {
                    text_input: text,
                    feedback: None,
                })
            })
            .await?;
        let raw: RawPrediction = decode("predict", &body)?;
        Ok(raw.into_record(Some(text)))
    }

    async fn send_feedback(&self, id: &PredictionId, liked: bool) -> ApiResult<()> {
        let url = self.endpoint(&format!("predictions/{id}/feedback"))?;
        self.send("feedback", |http| {
            http.post(url.clone())
                .json(&FeedbackRequest { feedback: liked })
        })
        .await?;
        Ok(())
    }

    async fn segment(&self, text: &str, max_words: usize) -> ApiResult<SegmentationResult> {
        let url = self.endpoint("segment")?;
        let body = self
            .send("segment", |http| {
                http.post(url.clone()).json(&SegmentRequest {
                    text_input: text,
                    max_words,
                })
            })
            .await?;
        let raw: RawSegmentation = decode("segment", &body)?;
        Ok(raw.into())
    }

    async fn predictions(&self, page: u32, limit: u32) -> ApiResult<HistoryPage> {
        let url = self.endpoint("predictions")?;
        let body = self
            .send("history", |http| {
                http.get(url.clone())
                    .query(&[("page", page), ("limit", limit)])
            })
            .await?;
        let raw: RawHistory = decode("history", &body)?;
        Ok(raw.into_page(page, limit))
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        let url = self.endpoint("health")?;
        let body = self.send("health", |http| http.get(url.clone())).await?;
        let raw: RawHealth = decode("health", &body)?;
        Ok(raw.into())
    }
}

//! HTTP client for the remote prediction service.
//!
//! The service exposes `POST /predict/` for one feature vector and
//! `POST /predict_batch/` for an ordered list. Failures are always returned
//! to the caller; no default label is ever substituted.

use crate::core::features::FeatureVector;
use crate::inference::label::Label;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default prediction service address.
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

/// Prediction service configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new client configuration.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Single-record endpoint URL.
    pub fn predict_url(&self) -> String {
        format!("{}/predict/", self.base_url)
    }

    /// Batch endpoint URL.
    pub fn batch_url(&self) -> String {
        format!("{}/predict_batch/", self.base_url)
    }

    /// Health check endpoint URL.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_URL, Duration::from_secs(10))
    }
}

/// Inference client error types.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// Response body could not be decoded
    Serialization(String),
    /// Batch response length differs from the request
    Misaligned { sent: usize, received: usize },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "Inference client config error: {msg}"),
            ClientError::Network(msg) => write!(f, "Prediction service unreachable: {msg}"),
            ClientError::Server { status, message } => {
                write!(f, "Prediction service error ({status}): {message}")
            }
            ClientError::Serialization(msg) => {
                write!(f, "Invalid prediction service response: {msg}")
            }
            ClientError::Misaligned { sent, received } => write!(
                f,
                "Prediction service returned {received} labels for {sent} records"
            ),
        }
    }
}

impl std::error::Error for ClientError {}

/// Body of a single prediction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Label,
}

/// Body of a batch prediction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<Label>,
}

/// Async client for the prediction service.
#[cfg(feature = "client")]
pub struct InferenceClient {
    config: ClientConfig,
    client: reqwest::Client,
}

#[cfg(feature = "client")]
impl InferenceClient {
    /// Create a new inference client.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Test connection to the prediction service.
    pub async fn test_connection(&self) -> Result<bool, ClientError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Classify one feature vector.
    pub async fn predict(&self, vector: &FeatureVector) -> Result<Label, ClientError> {
        let response: PredictResponse = self.post(&self.config.predict_url(), vector).await?;
        Ok(response.prediction)
    }

    /// Classify a batch; labels are aligned with `vectors`.
    pub async fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<Label>, ClientError> {
        if vectors.is_empty() {
            return Err(ClientError::Config("No records to predict".to_string()));
        }

        let response: BatchPredictResponse = self.post(&self.config.batch_url(), vectors).await?;
        if response.predictions.len() != vectors.len() {
            return Err(ClientError::Misaligned {
                sent: vectors.len(),
                received: response.predictions.len(),
            });
        }

        tracing::debug!(count = vectors.len(), "batch prediction complete");
        Ok(response.predictions)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Prediction service returned error {}: {}", status, message);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

/// Blocking client for use in synchronous contexts.
#[cfg(feature = "client")]
pub struct BlockingInferenceClient {
    inner: InferenceClient,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "client")]
impl BlockingInferenceClient {
    /// Create a new blocking inference client.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: InferenceClient::new(config)?,
            runtime,
        })
    }

    /// Test connection to the prediction service.
    pub fn test_connection(&self) -> Result<bool, ClientError> {
        self.runtime.block_on(self.inner.test_connection())
    }

    /// Classify one feature vector.
    pub fn predict(&self, vector: &FeatureVector) -> Result<Label, ClientError> {
        self.runtime.block_on(self.inner.predict(vector))
    }

    /// Classify a batch.
    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<Label>, ClientError> {
        self.runtime.block_on(self.inner.predict_batch(vectors))
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }
}

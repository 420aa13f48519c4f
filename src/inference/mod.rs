//! Classification of feature vectors.
//!
//! Two paths produce a [`Label`]: the local [`ModelBundle`] artifact, and
//! the remote prediction service through [`InferenceClient`].

pub mod client;
pub mod label;
pub mod model;

pub use client::{BatchPredictResponse, ClientConfig, ClientError, PredictResponse};
#[cfg(feature = "client")]
pub use client::{BlockingInferenceClient, InferenceClient};
pub use label::{Label, LabelCounts};
pub use model::{Classifier, ModelBundle, ModelError, Scaler};

//! HTTP client for the cardiac analysis service.
//!
//! Covers the two network contracts the viewer relies on: per-artifact `GET`
//! retrieval of derived media and the multipart `POST /video` upload ingress.

mod client;
mod config;
mod error;

pub use client::{AnalysisClient, ArtifactPayload, DEFAULT_CONTENT_TYPE, UPLOAD_FIELD_NAME};
pub use config::{AnalysisHttpConfig, DEFAULT_ARTIFACT_BASE_URL, DEFAULT_UPLOAD_URL};
pub use error::{AnalysisHttpError, Result};

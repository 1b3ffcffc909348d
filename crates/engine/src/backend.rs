use std::future::Future;
use std::path::{Path, PathBuf};

use analysis_http::AnalysisClient;

use crate::artifact::ArtifactKind;
use crate::error::{EngineError, Result};
use crate::handle::FetchedMedia;
use crate::status::AnalysisResult;

/// Network operations required to drive a [`crate::Controller`].
pub trait AnalysisBackend {
    /// Rejects submissions that would fail at the ingress, without I/O beyond
    /// local metadata.
    fn check_upload(&self, path: &Path) -> Result<()>;

    /// Uploads a video and resolves with the finished analysis.
    fn submit_video(&self, path: PathBuf) -> impl Future<Output = Result<AnalysisResult>> + Send;

    /// Retrieves the derived media for one artifact kind.
    fn fetch_artifact(
        &self,
        kind: ArtifactKind,
    ) -> impl Future<Output = Result<FetchedMedia>> + Send;
}

/// reqwest-backed backend used by production wiring.
#[derive(Debug, Clone)]
pub struct HttpAnalysisBackend {
    client: AnalysisClient,
}

impl HttpAnalysisBackend {
    pub fn new(client: AnalysisClient) -> Self {
        Self { client }
    }

    /// Builds a backend from `ECHO_*` environment configuration.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(AnalysisClient::from_env()?))
    }
}

impl AnalysisBackend for HttpAnalysisBackend {
    fn check_upload(&self, path: &Path) -> Result<()> {
        self.client.validate_upload(path)?;
        Ok(())
    }

    fn submit_video(&self, path: PathBuf) -> impl Future<Output = Result<AnalysisResult>> + Send {
        let client = self.client.clone();
        async move { Ok(client.upload_video::<AnalysisResult>(&path).await?) }
    }

    fn fetch_artifact(
        &self,
        kind: ArtifactKind,
    ) -> impl Future<Output = Result<FetchedMedia>> + Send {
        let client = self.client.clone();
        async move {
            client
                .fetch_artifact(kind.route())
                .await
                .map(FetchedMedia::from)
                .map_err(|source| EngineError::Retrieval { kind, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use analysis_http::{AnalysisClient, AnalysisHttpConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{AnalysisBackend, HttpAnalysisBackend};
    use crate::api::EngineErrorKind;
    use crate::artifact::ArtifactKind;

    fn backend_for(server: &MockServer) -> HttpAnalysisBackend {
        HttpAnalysisBackend::new(
            AnalysisClient::new(AnalysisHttpConfig {
                artifact_base_url: server.uri(),
                ..AnalysisHttpConfig::default()
            })
            .expect("client should build"),
        )
    }

    #[tokio::test]
    async fn fetch_artifact_uses_route_of_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-ecg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7_u8; 3], "image/png"))
            .expect(1)
            .mount(&server)
            .await;

        let media = backend_for(&server)
            .fetch_artifact(ArtifactKind::Ecg)
            .await
            .expect("fetch should succeed");

        assert_eq!(media.content_type, "image/png");
        assert_eq!(media.bytes.as_ref(), &[7, 7, 7]);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_as_retrieval_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-video"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = backend_for(&server)
            .fetch_artifact(ArtifactKind::Video)
            .await
            .expect_err("503 must fail");

        assert_eq!(EngineErrorKind::from(&error), EngineErrorKind::Retrieval);
        assert!(error.to_string().contains("video artifact"));
    }
}

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AnalysisHttpConfig;
use crate::error::{AnalysisHttpError, Result};

/// Content type assumed when the service omits one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart field carrying the uploaded video.
pub const UPLOAD_FIELD_NAME: &str = "video";

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

/// Binary body of one artifact response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayload {
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: String,
}

/// Thin client over the analysis service routes.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: Client,
    config: AnalysisHttpConfig,
}

impl AnalysisClient {
    /// Creates a client for `config`.
    pub fn new(config: AnalysisHttpConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// Creates a client configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(AnalysisHttpConfig::from_env())
    }

    /// Retrieves one derived artifact. Any non-2xx status is an error.
    ///
    /// # Example
    /// ```no_run
    /// use analysis_http::AnalysisClient;
    ///
    /// # async fn run() -> analysis_http::Result<()> {
    /// let client = AnalysisClient::from_env()?;
    /// let payload = client.fetch_artifact("/get-video").await?;
    /// assert!(!payload.bytes.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_artifact(&self, route: &str) -> Result<ArtifactPayload> {
        let url = self.config.artifact_url(route);
        debug!(%url, "fetching artifact");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisHttpError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());
        let bytes = response.bytes().await?;
        debug!(%url, %content_type, len = bytes.len(), "artifact received");

        Ok(ArtifactPayload {
            content_type,
            bytes: Arc::from(bytes.as_ref()),
        })
    }

    /// Checks extension and size limits without touching the network.
    pub fn validate_upload(&self, path: &Path) -> Result<u64> {
        let invalid = |reason: String| AnalysisHttpError::InvalidUpload {
            path: path.to_path_buf(),
            reason,
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| invalid("file has no extension".to_owned()))?;
        if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(invalid(format!("unsupported file type .{extension}")));
        }

        let metadata = std::fs::metadata(path).map_err(|source| AnalysisHttpError::Io {
            context: "failed to read upload metadata",
            source,
        })?;
        if !metadata.is_file() {
            return Err(invalid("not a regular file".to_owned()));
        }
        let len = metadata.len();
        if len == 0 {
            return Err(invalid("file is empty".to_owned()));
        }
        if len > self.config.max_upload_bytes {
            return Err(invalid(format!(
                "file is {len} bytes, limit is {}",
                self.config.max_upload_bytes
            )));
        }
        Ok(len)
    }

    /// Uploads a video to the ingress route and decodes the JSON reply as `T`.
    pub async fn upload_video<T>(&self, path: &Path) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.validate_upload(path)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AnalysisHttpError::Io {
                context: "failed to read upload",
                source,
            })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.mp4")
            .to_owned();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(video_mime(path))?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let url = &self.config.upload_url;
        debug!(%url, path = %path.display(), "uploading video");
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => format!("upload rejected, body unreadable: {error}"),
            };
            let message = serde_json::from_str::<UploadErrorBody>(&body)
                .map(|parsed| parsed.error)
                .unwrap_or(body);
            warn!(%message, "upload rejected");
            return Err(AnalysisHttpError::UploadRejected {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            return Err(AnalysisHttpError::UnexpectedStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn video_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::video_mime;

    #[test]
    fn video_mime_follows_extension_case_insensitively() {
        assert_eq!(video_mime(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(video_mime(Path::new("a.webm")), "video/webm");
        assert_eq!(video_mime(Path::new("a.mp4")), "video/mp4");
    }
}

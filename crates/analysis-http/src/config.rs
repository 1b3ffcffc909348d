use std::time::Duration;

/// Default base URL serving derived artifacts.
pub const DEFAULT_ARTIFACT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default upload ingress.
pub const DEFAULT_UPLOAD_URL: &str = "http://127.0.0.1:3000/video";

const DEFAULT_MAX_UPLOAD_MB: u64 = 100;

/// Endpoints and limits for [`crate::AnalysisClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisHttpConfig {
    /// Base URL that artifact routes are appended to.
    pub artifact_base_url: String,
    /// Full URL of the multipart upload route.
    pub upload_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: u64,
}

impl Default for AnalysisHttpConfig {
    fn default() -> Self {
        Self {
            artifact_base_url: DEFAULT_ARTIFACT_BASE_URL.to_owned(),
            upload_url: DEFAULT_UPLOAD_URL.to_owned(),
            request_timeout: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl AnalysisHttpConfig {
    /// Reads configuration from `ECHO_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            artifact_base_url: lookup("ECHO_ARTIFACT_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.artifact_base_url),
            upload_url: lookup("ECHO_UPLOAD_URL").unwrap_or(defaults.upload_url),
            request_timeout: lookup("ECHO_HTTP_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_upload_bytes: lookup("ECHO_MAX_UPLOAD_MB")
                .and_then(|value| value.parse::<u64>().ok())
                .map(|mb| mb.saturating_mul(1024 * 1024))
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// Joins the artifact base URL and a route.
    pub fn artifact_url(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.artifact_base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

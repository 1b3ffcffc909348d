use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// One category of derived media produced by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// Full processed video with the segmentation overlay.
    Video,
    Mask,
    Ecg,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Video, Self::Mask, Self::Ecg];

    /// Route appended to the artifact base URL.
    pub fn route(self) -> &'static str {
        match self {
            Self::Video => "/get-video",
            Self::Mask => "/get-mask",
            Self::Ecg => "/get-ecg",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Video => "Segmentation Result",
            Self::Mask => "Segmentation Mask",
            Self::Ecg => "ECG",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Mask => "mask",
            Self::Ecg => "ecg",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArtifactKind {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| EngineError::UnknownArtifactKind {
                name: value.to_owned(),
            })
    }
}

/// Ordered set of artifact kinds retrieved for every completed analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactProfile {
    kinds: Vec<ArtifactKind>,
}

impl ArtifactProfile {
    /// Builds a profile, dropping repeated kinds while keeping first-seen order.
    pub fn new(kinds: impl IntoIterator<Item = ArtifactKind>) -> Result<Self> {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        if unique.is_empty() {
            return Err(EngineError::EmptyArtifactProfile);
        }
        Ok(Self { kinds: unique })
    }

    /// Single processed video next to the input.
    pub fn segmented_video() -> Self {
        Self {
            kinds: vec![ArtifactKind::Video],
        }
    }

    /// Segmentation mask and ECG visualization.
    pub fn mask_and_ecg() -> Self {
        Self {
            kinds: vec![ArtifactKind::Mask, ArtifactKind::Ecg],
        }
    }

    /// Reads `ECHO_ARTIFACTS`, defaulting to [`Self::segmented_video`].
    pub fn from_env() -> Result<Self> {
        match std::env::var("ECHO_ARTIFACTS") {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::segmented_video()),
        }
    }

    pub fn kinds(&self) -> &[ArtifactKind] {
        &self.kinds
    }
}

impl Default for ArtifactProfile {
    fn default() -> Self {
        Self::segmented_video()
    }
}

impl FromStr for ArtifactProfile {
    type Err = EngineError;

    /// Parses a comma separated list such as `"mask,ecg"`.
    fn from_str(value: &str) -> Result<Self> {
        let kinds = value
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<ArtifactKind>>>()?;
        Self::new(kinds)
    }
}

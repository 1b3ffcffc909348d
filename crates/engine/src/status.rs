use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};

/// Outcome of one completed cardiac analysis, as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Left-ventricular ejection fraction in percent.
    pub ejection_fraction: f64,
    pub problem: String,
    pub cause: String,
    pub cure: String,
}

/// Lifecycle of the current analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Processing,
    Complete(AnalysisResult),
}

impl ProcessingStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Complete(_) => "complete",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Complete(result) => Some(result),
            _ => None,
        }
    }
}

/// Projection of externally driven processing state plus the caller's
/// display order.
///
/// A new `Complete` is only reachable through `Processing`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTracker {
    status: ProcessingStatus,
    order: u64,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &ProcessingStatus {
        &self.status
    }

    /// Opaque display index supplied with the last `begin_processing`.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Returns the analysis result only while the status is `Complete`.
    pub fn report(&self) -> Option<&AnalysisResult> {
        self.status.result()
    }

    /// `Idle | Complete -> Processing`.
    pub fn begin_processing(&mut self, order: u64) -> Result<()> {
        if self.status.is_processing() {
            return Err(EngineError::AlreadyProcessing);
        }
        info!(from = self.status.name(), order, "processing started");
        self.status = ProcessingStatus::Processing;
        self.order = order;
        Ok(())
    }

    /// `Processing -> Complete`.
    pub fn complete(&mut self, result: AnalysisResult) -> Result<()> {
        if !self.status.is_processing() {
            return Err(EngineError::InvalidTransition {
                from: self.status.name(),
                to: "complete",
            });
        }
        info!(
            order = self.order,
            ejection_fraction = result.ejection_fraction,
            "analysis complete"
        );
        self.status = ProcessingStatus::Complete(result);
        Ok(())
    }

    /// `Processing -> Idle`, for submissions the ingress refused.
    pub fn abort(&mut self) -> Result<()> {
        if !self.status.is_processing() {
            return Err(EngineError::InvalidTransition {
                from: self.status.name(),
                to: "idle",
            });
        }
        info!(order = self.order, "processing aborted");
        self.status = ProcessingStatus::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisResult, ProcessingStatus, StatusTracker};
    use crate::error::EngineError;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            ejection_fraction: 55.3,
            problem: "Reduced EF".to_owned(),
            cause: "cause".to_owned(),
            cure: "cure".to_owned(),
        }
    }

    #[test]
    fn idle_cannot_jump_to_complete() {
        let mut tracker = StatusTracker::new();

        let result = tracker.complete(sample_result());

        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition {
                from: "idle",
                to: "complete"
            })
        ));
        assert_eq!(tracker.status(), &ProcessingStatus::Idle);
    }

    #[test]
    fn complete_requires_processing_again_before_next_complete() {
        let mut tracker = StatusTracker::new();
        tracker.begin_processing(1).expect("begin processing");
        tracker.complete(sample_result()).expect("complete");

        assert!(tracker.complete(sample_result()).is_err());

        tracker.begin_processing(2).expect("begin second run");
        assert_eq!(tracker.order(), 2);
        assert!(tracker.report().is_none());
        tracker.complete(sample_result()).expect("complete second run");
        assert_eq!(tracker.report(), Some(&sample_result()));
    }

    #[test]
    fn processing_twice_is_rejected_and_keeps_order() {
        let mut tracker = StatusTracker::new();
        tracker.begin_processing(7).expect("begin processing");

        assert!(matches!(
            tracker.begin_processing(8),
            Err(EngineError::AlreadyProcessing)
        ));
        assert_eq!(tracker.order(), 7);
    }

    #[test]
    fn abort_returns_to_idle_only_from_processing() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.abort().is_err());

        tracker.begin_processing(1).expect("begin processing");
        tracker.abort().expect("abort");

        assert_eq!(tracker.status(), &ProcessingStatus::Idle);
    }

    #[test]
    fn analysis_result_uses_camel_case_wire_names() {
        let parsed: AnalysisResult = serde_json::from_str(
            r#"{"ejectionFraction":55.3,"problem":"Reduced EF","cause":"c","cure":"d"}"#,
        )
        .expect("parse analysis result");

        assert_eq!(parsed.ejection_fraction, 55.3);
        assert_eq!(parsed.problem, "Reduced EF");
    }
}

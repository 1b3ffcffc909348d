//! Display values for the metrics and diagnosis sections.

use crate::status::AnalysisResult;

/// Reference end-diastolic volume shown next to every result.
pub const END_DIASTOLIC_VOLUME_ML: f64 = 134.44;
/// Reference end-systolic volume shown next to every result.
pub const END_SYSTOLIC_VOLUME_ML: f64 = 73.28;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    pub ejection_fraction: f64,
    pub end_diastolic_volume_ml: f64,
    pub end_systolic_volume_ml: f64,
}

impl MetricsSummary {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            ejection_fraction: result.ejection_fraction,
            end_diastolic_volume_ml: END_DIASTOLIC_VOLUME_ML,
            end_systolic_volume_ml: END_SYSTOLIC_VOLUME_ML,
        }
    }

    pub fn stroke_volume_ml(&self) -> f64 {
        self.end_diastolic_volume_ml - self.end_systolic_volume_ml
    }

    pub fn ejection_fraction_label(&self) -> String {
        format!("{:.1}%", self.ejection_fraction)
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Ejection Fraction", self.ejection_fraction_label()),
            (
                "End-Diastolic Volume",
                format!("{:.2} mL", self.end_diastolic_volume_ml),
            ),
            (
                "End-Systolic Volume",
                format!("{:.2} mL", self.end_systolic_volume_ml),
            ),
            ("Stroke Volume", format!("{:.2} mL", self.stroke_volume_ml())),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosisSummary<'a> {
    pub problem: &'a str,
    pub cause: &'a str,
    pub cure: &'a str,
}

impl<'a> DiagnosisSummary<'a> {
    pub fn from_result(result: &'a AnalysisResult) -> Self {
        Self {
            problem: &result.problem,
            cause: &result.cause,
            cure: &result.cure,
        }
    }
}

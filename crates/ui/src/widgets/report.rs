use engine::{AnalysisResult, DiagnosisSummary, MetricsSummary};
use iced::widget::{Row, column, container, text};
use iced::{Element, Length};

/// Renders the metric cards for a completed analysis.
pub fn metrics_view<'a, Message>(result: &AnalysisResult) -> Element<'a, Message>
where
    Message: 'a,
{
    let cards = MetricsSummary::from_result(result)
        .rows()
        .into_iter()
        .map(|(label, value)| -> Element<'a, Message> {
            container(column![text(label).size(14), text(value).size(24)].spacing(4))
                .padding(12)
                .width(Length::FillPortion(1))
                .into()
        });

    Row::with_children(cards).spacing(16).into()
}

/// Renders problem, cause and recommended treatment.
pub fn diagnosis_view<'a, Message>(result: &'a AnalysisResult) -> Element<'a, Message>
where
    Message: 'a,
{
    let diagnosis = DiagnosisSummary::from_result(result);
    column![
        text("Diagnosis").size(18),
        text(format!("Problem: {}", diagnosis.problem)),
        text(format!("Cause: {}", diagnosis.cause)),
        text(format!("Treatment: {}", diagnosis.cure)),
    ]
    .spacing(6)
    .into()
}

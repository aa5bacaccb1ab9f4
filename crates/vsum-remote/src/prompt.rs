//! Summary prompt construction.

use vsum_models::{FocusArea, SummaryLength, SummarySettings};

pub const SYSTEM_PROMPT: &str =
    "You are an advanced assistant that processes video transcripts to provide detailed insights.";

/// Field labels the summary must contain, in order.
pub const SUMMARY_FIELDS: [&str; 4] = ["Genre:", "Emotion/tone:", "Summary:", "Key takeaway:"];

fn length_instruction(length: SummaryLength) -> &'static str {
    match length {
        SummaryLength::Short => "less than 100 words",
        SummaryLength::Medium => "less than 150 words",
        SummaryLength::Long => "less than 300 words",
    }
}

fn focus_instruction(area: FocusArea) -> &'static str {
    match area {
        FocusArea::TechnicalDetails => "technical specifications, methodologies",
        FocusArea::KeyPoints => "main arguments, core concepts",
        FocusArea::ActionItems => "actionable steps, recommendations",
        FocusArea::BalancedOverview => "paragraph with balanced view",
    }
}

/// Build the user message sent to the model.
pub fn build_user_prompt(transcript: &str, settings: &SummarySettings) -> String {
    let settings = settings.normalized();
    let lang = settings.language.as_str();
    let length = length_instruction(settings.length);
    let focus = settings
        .focus_areas
        .iter()
        .map(|a| focus_instruction(*a))
        .collect::<Vec<_>>()
        .join(", ");

    let summary_line = if settings.is_balanced_overview() {
        format!("3. Summary: a single paragraph in {lang} giving a balanced overview focused on {focus}.")
    } else {
        format!("3. Point-wise Summary: bullet points in {lang} focused on {focus}.")
    };

    format!(
        r#"Summarize: Generate a {length} summary in {lang}. Length is very important. Focus on: {focus}
Format the response as follows:
1. Genre: [one-word genre] in {lang}.
2. Emotion/tone: [one-word emotion] in {lang}.
{summary_line}
4. Key takeaway: [1-2 line essence of what should be learned] in {lang}.

TRANSCRIPT:
{transcript}"#
    )
}

/// Structural check that a generated summary carries all four fields.
///
/// "Point-wise Summary:" satisfies the summary field.
pub fn summary_has_all_fields(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    SUMMARY_FIELDS
        .iter()
        .all(|field| lower.contains(&field.to_lowercase()))
}

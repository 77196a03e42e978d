use serde::{Deserialize, Serialize};

use crate::domain::StampedSubmission;

/// The JSON document POSTed to the webhook sink. Key names match the sheet
/// column headers so a receiver sees the same vocabulary in both systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "VideoURL")]
    pub video_url: String,
    #[serde(rename = "AdditionalData")]
    pub additional_data: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl From<&StampedSubmission> for WebhookPayload {
    fn from(submission: &StampedSubmission) -> Self {
        Self {
            title: submission.candidate.title.clone(),
            video_url: submission.candidate.video_url.clone(),
            additional_data: submission.candidate.additional_data.clone(),
            category: submission.candidate.category.clone(),
            tags: submission.candidate.tags.clone(),
            timestamp: submission.timestamp.clone(),
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(SheetId);
name_newtype!(WorksheetName);

/// One record read from a worksheet. Values are aligned with the owning
/// [`RowSet`]'s column list; numeric and date cells keep their display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<String>,
}

/// An immutable snapshot of one worksheet read. Every row carries exactly
/// `columns.len()` values; the column set is read fresh on every load and
/// never reconciled across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Looks up one cell by column name. `None` when the column does not
    /// exist in this snapshot.
    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        let index = self.column_index(column)?;
        row.values.get(index).map(String::as_str)
    }

    /// Appends a row, padding or truncating to the snapshot's column count.
    pub fn push_row(&mut self, mut values: Vec<String>) {
        values.resize(self.columns.len(), String::new());
        self.rows.push(Row { values });
    }
}

/// A user-filled submission as collected by the form. All fields except the
/// video URL are optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSubmission {
    pub title: String,
    pub video_url: String,
    pub additional_data: String,
    pub category: String,
    pub tags: String,
}

impl CandidateSubmission {
    /// The sole acceptance gate: the video URL must be present and start
    /// with `http`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.video_url.is_empty() {
            return Err(ValidationError::MissingVideoUrl);
        }
        if !self.video_url.starts_with("http") {
            return Err(ValidationError::MalformedVideoUrl {
                url: self.video_url.clone(),
            });
        }
        Ok(())
    }
}

/// A validated submission with its server-assigned timestamp. Created only
/// after validation passes; this is what both targets receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedSubmission {
    pub candidate: CandidateSubmission,
    pub timestamp: String,
}

impl StampedSubmission {
    /// The fixed column order appended to the sheet:
    /// Title, VideoURL, AdditionalData, Category, Tags, Timestamp.
    pub fn sheet_row(&self) -> Vec<String> {
        vec![
            self.candidate.title.clone(),
            self.candidate.video_url.clone(),
            self.candidate.additional_data.clone(),
            self.candidate.category.clone(),
            self.candidate.tags.clone(),
            self.timestamp.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionTarget {
    Sheet,
    Webhook,
}

/// Terminal per-target outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetOutcome {
    Succeeded,
    Failed { reason: String },
    /// The target was not eligible for this submission; no call was made.
    Skipped,
}

impl TargetOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOutcome {
    AllSucceeded,
    PartialSuccess,
    AllFailed,
}

/// Which targets the user asked for. The webhook flag only makes the
/// webhook *eligible*; a configured address is still required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOptions {
    pub submit_to_sheet: bool,
    pub submit_to_webhook: bool,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            submit_to_sheet: true,
            submit_to_webhook: false,
        }
    }
}

/// The reconciled result of one submission cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub submission_id: Uuid,
    pub timestamp: String,
    pub sheet: TargetOutcome,
    pub webhook: TargetOutcome,
    pub aggregate: AggregateOutcome,
    /// True iff the sheet append succeeded; drives the read-cache flush.
    pub cache_invalidated: bool,
    /// True iff every eligible target succeeded; the UI may clear the form.
    pub reset_form: bool,
}

impl SubmissionReport {
    pub fn outcome(&self, target: SubmissionTarget) -> &TargetOutcome {
        match target {
            SubmissionTarget::Sheet => &self.sheet,
            SubmissionTarget::Webhook => &self.webhook,
        }
    }
}

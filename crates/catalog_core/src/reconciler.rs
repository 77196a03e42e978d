//! The submission reconciliation workflow: validate, stamp, dispatch to each
//! eligible target independently, then fold the per-target outcomes into one
//! report. Validation failure is the only error path; every later failure is
//! recorded in the report instead of propagated.

use chrono::Local;
use shared::{
    domain::{
        AggregateOutcome, CandidateSubmission, SheetId, StampedSubmission, SubmissionOptions,
        SubmissionReport, TargetOutcome, WorksheetName,
    },
    error::ValidationError,
    protocol::WebhookPayload,
};
use sheets_gateway::SpreadsheetGateway;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::webhook::WebhookSink;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) struct ReconcileOutput {
    pub report: SubmissionReport,
    pub warnings: Vec<String>,
}

/// Stamped once, immediately after validation passes. Both targets see this
/// same instant regardless of when their dispatch lands.
fn stamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn aggregate(outcomes: &[&TargetOutcome]) -> AggregateOutcome {
    let eligible: Vec<_> = outcomes.iter().filter(|o| !o.is_skipped()).collect();
    // No eligible targets degenerates to a failure: nothing was recorded
    // anywhere, so nothing downstream may act as if it had been.
    if eligible.is_empty() || eligible.iter().all(|o| o.is_failed()) {
        AggregateOutcome::AllFailed
    } else if eligible.iter().all(|o| o.is_succeeded()) {
        AggregateOutcome::AllSucceeded
    } else {
        AggregateOutcome::PartialSuccess
    }
}

pub(crate) async fn reconcile(
    gateway: &dyn SpreadsheetGateway,
    sink: &dyn WebhookSink,
    sheet_id: &SheetId,
    worksheet: &WorksheetName,
    webhook_url: Option<&Url>,
    candidate: &CandidateSubmission,
    options: SubmissionOptions,
) -> Result<ReconcileOutput, ValidationError> {
    candidate.validate()?;
    let stamped = StampedSubmission {
        candidate: candidate.clone(),
        timestamp: stamp_now(),
    };
    let submission_id = Uuid::new_v4();

    let mut warnings = Vec::new();
    let webhook_target = match (options.submit_to_webhook, webhook_url) {
        (true, Some(url)) => Some(url),
        (true, None) => {
            warnings.push("webhook submission requested but no webhook URL is configured".to_string());
            None
        }
        (false, _) => None,
    };

    let sheet_dispatch = async {
        if !options.submit_to_sheet {
            return TargetOutcome::Skipped;
        }
        match gateway
            .append_row(sheet_id, worksheet, &stamped.sheet_row())
            .await
        {
            Ok(()) => TargetOutcome::Succeeded,
            Err(err) => TargetOutcome::failed(err.to_string()),
        }
    };
    let webhook_dispatch = async {
        let Some(url) = webhook_target else {
            return TargetOutcome::Skipped;
        };
        match sink.deliver(url, &WebhookPayload::from(&stamped)).await {
            Ok(()) => TargetOutcome::Succeeded,
            Err(err) => TargetOutcome::failed(err.to_string()),
        }
    };
    // Both targets run to completion; one failing never short-circuits the
    // other.
    let (sheet, webhook) = tokio::join!(sheet_dispatch, webhook_dispatch);

    let aggregate = aggregate(&[&sheet, &webhook]);
    let report = SubmissionReport {
        submission_id,
        timestamp: stamped.timestamp,
        cache_invalidated: sheet.is_succeeded(),
        reset_form: aggregate == AggregateOutcome::AllSucceeded,
        sheet,
        webhook,
        aggregate,
    };

    for warning in &warnings {
        warn!(%submission_id, "{warning}");
    }
    info!(
        %submission_id,
        aggregate = ?report.aggregate,
        sheet = ?report.sheet,
        webhook = ?report.webhook,
        "submission reconciled"
    );
    Ok(ReconcileOutput { report, warnings })
}

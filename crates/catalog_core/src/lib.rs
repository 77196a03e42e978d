//! Client core for a spreadsheet-backed video catalog: cached worksheet
//! reads, pure row filtering, and the submission reconciliation workflow
//! that writes one entry to the sheet and mirrors it to a webhook.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{
        CandidateSubmission, RowSet, SheetId, SubmissionOptions, SubmissionReport, WorksheetName,
    },
    error::{GatewayError, ValidationError},
};
use sheets_gateway::SpreadsheetGateway;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

pub mod cache;
pub mod filter;
mod reconciler;
pub mod webhook;

pub use cache::{RowCache, DEFAULT_TTL};
pub use webhook::{HttpWebhookSink, WebhookSink, DEFAULT_TIMEOUT};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications emitted as side effects of client operations. Subscribers
/// that lag simply miss events; nothing blocks on delivery.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    SubmissionReconciled(SubmissionReport),
    CacheInvalidated {
        sheet_id: SheetId,
        worksheet: WorksheetName,
    },
    Warning(String),
}

/// The one client the rest of the application talks to. Holds the gateway
/// and webhook sink behind their traits, the read-cache, and the optional
/// webhook address.
pub struct CatalogClient {
    gateway: Arc<dyn SpreadsheetGateway>,
    sink: Arc<dyn WebhookSink>,
    cache: RowCache,
    webhook_url: Option<Url>,
    events: broadcast::Sender<CatalogEvent>,
}

impl CatalogClient {
    pub fn new(gateway: Arc<dyn SpreadsheetGateway>, sink: Arc<dyn WebhookSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            sink,
            cache: RowCache::default(),
            webhook_url: None,
            events,
        }
    }

    pub fn with_webhook_url(mut self, url: Option<Url>) -> Self {
        self.webhook_url = url;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = RowCache::new(ttl);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CatalogEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    pub async fn list_worksheets(
        &self,
        sheet_id: &SheetId,
    ) -> Result<Vec<WorksheetName>, GatewayError> {
        self.gateway.list_worksheets(sheet_id).await
    }

    /// The cached read path. A fresh snapshot is served from memory; a miss
    /// or an expired entry re-reads the worksheet and repopulates the cache.
    pub async fn load_rows(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
    ) -> Result<Arc<RowSet>, GatewayError> {
        if let Some(rows) = self.cache.get(sheet_id, worksheet).await {
            debug!(sheet_id = %sheet_id, worksheet = %worksheet, "serving cached snapshot");
            return Ok(rows);
        }
        let rows = Arc::new(self.gateway.read_all_records(sheet_id, worksheet).await?);
        self.cache
            .insert(sheet_id, worksheet, Arc::clone(&rows))
            .await;
        Ok(rows)
    }

    /// Drops the cached snapshot so the next load re-reads the worksheet.
    pub async fn refresh(&self, sheet_id: &SheetId, worksheet: &WorksheetName) {
        self.cache.invalidate(sheet_id, worksheet).await;
        self.emit(CatalogEvent::CacheInvalidated {
            sheet_id: sheet_id.clone(),
            worksheet: worksheet.clone(),
        });
    }

    /// Runs one submission through the reconciliation workflow. `Err` means
    /// the candidate was rejected before any side effect; every dispatch
    /// failure is inside the returned report.
    pub async fn submit(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
        candidate: &CandidateSubmission,
        options: SubmissionOptions,
    ) -> Result<SubmissionReport, ValidationError> {
        let output = reconciler::reconcile(
            self.gateway.as_ref(),
            self.sink.as_ref(),
            sheet_id,
            worksheet,
            self.webhook_url.as_ref(),
            candidate,
            options,
        )
        .await?;

        for warning in output.warnings {
            self.emit(CatalogEvent::Warning(warning));
        }
        if output.report.cache_invalidated {
            self.cache.invalidate(sheet_id, worksheet).await;
            self.emit(CatalogEvent::CacheInvalidated {
                sheet_id: sheet_id.clone(),
                worksheet: worksheet.clone(),
            });
        }
        self.emit(CatalogEvent::SubmissionReconciled(output.report.clone()));
        Ok(output.report)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use catalog_core::{filter, CatalogClient, HttpWebhookSink};
use clap::{Parser, Subcommand};
use shared::domain::{CandidateSubmission, RowSet, SheetId, SubmissionOptions, WorksheetName};
use sheets_gateway::{
    HttpSheetsGateway, ServiceAccountKey, SpreadsheetGateway, TokenProvider, UnconfiguredGateway,
};
use tracing::info;
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "sheetcast", about = "Spreadsheet-backed video catalog client")]
struct Cli {
    /// Spreadsheet to operate on; falls back to the configured one.
    #[arg(long)]
    sheet_id: Option<String>,
    /// Worksheet tab; falls back to the configured one.
    #[arg(long)]
    worksheet: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the worksheet tabs of the spreadsheet.
    Worksheets,
    /// Show the worksheet rows, optionally filtered.
    Rows {
        /// Case-insensitive substring to filter rows by.
        #[arg(long, default_value = "")]
        search: String,
        /// Restrict the search to one column.
        #[arg(long)]
        column: Option<String>,
    },
    /// Show one page of rows that carry a playable video link.
    Videos {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Submit a new catalog entry.
    Submit {
        #[arg(long, default_value = "", value_parser = parse_title)]
        title: String,
        #[arg(long)]
        video_url: String,
        #[arg(long, default_value = "")]
        additional_data: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        tags: String,
        /// Skip the sheet append.
        #[arg(long)]
        no_sheet: bool,
        /// Also forward the entry to the configured webhook.
        #[arg(long)]
        webhook: bool,
    },
    /// Drop the cached snapshot so the next read hits the sheet.
    Refresh,
}

const TITLE_MAX_CHARS: usize = 200;

/// Form-boundary constraint; the core itself only gates on the video URL.
fn parse_title(raw: &str) -> Result<String, String> {
    if raw.chars().count() > TITLE_MAX_CHARS {
        return Err(format!("title is limited to {TITLE_MAX_CHARS} characters"));
    }
    Ok(raw.to_string())
}

fn build_gateway(settings: &config::Settings) -> Result<Arc<dyn SpreadsheetGateway>> {
    let Some(path) = &settings.service_account_path else {
        return Ok(Arc::new(UnconfiguredGateway));
    };
    let key = ServiceAccountKey::from_file(path)?;
    let tokens = Arc::new(TokenProvider::new(key));
    let gateway = match &settings.sheets_base_url {
        Some(base_url) => HttpSheetsGateway::with_base_url(tokens, base_url.clone()),
        None => HttpSheetsGateway::new(tokens),
    };
    Ok(Arc::new(gateway))
}

fn print_rows(rows: &RowSet) {
    println!("{}", rows.columns.join(" | "));
    for row in &rows.rows {
        println!("{}", row.values.join(" | "));
    }
    println!("({} rows)", rows.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let settings = load_settings();

    let sheet_id = cli.sheet_id.unwrap_or_else(|| settings.sheet_id.clone());
    if sheet_id.is_empty() {
        bail!("no spreadsheet configured; pass --sheet-id or set sheet_id in sheetcast.toml");
    }
    let sheet_id = SheetId::new(sheet_id);
    let worksheet = WorksheetName::new(cli.worksheet.unwrap_or_else(|| settings.worksheet.clone()));

    let webhook_url = match &settings.webhook_url {
        Some(raw) => Some(Url::parse(raw)?),
        None => None,
    };
    let client = CatalogClient::new(build_gateway(&settings)?, Arc::new(HttpWebhookSink::new()))
        .with_webhook_url(webhook_url)
        .with_cache_ttl(Duration::from_secs(settings.cache_ttl_seconds));

    match cli.command {
        Command::Worksheets => {
            for name in client.list_worksheets(&sheet_id).await? {
                println!("{name}");
            }
        }
        Command::Rows { search, column } => {
            let rows = client.load_rows(&sheet_id, &worksheet).await?;
            let filtered = filter::apply(&rows, &search, column.as_deref());
            print_rows(&filtered);
        }
        Command::Videos { page } => {
            let rows = client.load_rows(&sheet_id, &worksheet).await?;
            let videos = filter::video_rows(&rows, &settings.video_column);
            let pages = filter::page_count(videos.len(), settings.items_per_page);
            let bounds = filter::page_bounds(videos.len(), settings.items_per_page, page);

            let mut shown = RowSet::new(videos.columns.clone());
            shown.rows.extend_from_slice(&videos.rows[bounds]);
            print_rows(&shown);
            println!("page {page} of {pages}");
        }
        Command::Submit {
            title,
            video_url,
            additional_data,
            category,
            tags,
            no_sheet,
            webhook,
        } => {
            let candidate = CandidateSubmission {
                title,
                video_url,
                additional_data,
                category,
                tags,
            };
            let options = SubmissionOptions {
                submit_to_sheet: !no_sheet,
                submit_to_webhook: webhook,
            };
            let report = client
                .submit(&sheet_id, &worksheet, &candidate, options)
                .await?;
            info!(
                submission_id = %report.submission_id,
                aggregate = ?report.aggregate,
                cache_invalidated = report.cache_invalidated,
                "submission reconciled"
            );
            println!("submission {}", report.submission_id);
            println!("  sheet:   {:?}", report.sheet);
            println!("  webhook: {:?}", report.webhook);
            println!("  result:  {:?}", report.aggregate);
        }
        Command::Refresh => {
            client.refresh(&sheet_id, &worksheet).await;
            println!("cache cleared for {sheet_id}/{worksheet}");
        }
    }

    Ok(())
}

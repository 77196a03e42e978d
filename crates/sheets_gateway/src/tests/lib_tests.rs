use super::*;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

const KNOWN_SHEET: &str = "sheet-1";

// Tests talk to in-process servers; a proxy from the ambient environment
// must not intercept those requests.
fn no_proxy_client() -> Client {
    Client::builder().no_proxy().build().expect("client")
}

#[derive(Clone)]
struct SheetsServerState {
    grid: Arc<Mutex<Vec<Vec<String>>>>,
    appended: Arc<Mutex<Vec<Vec<String>>>>,
    deny_access: Arc<Mutex<bool>>,
    bearer_tokens_seen: Arc<Mutex<Vec<String>>>,
}

fn record_bearer(headers: &HeaderMap, state: &SheetsServerState) {
    if let Some(value) = headers.get("authorization") {
        let token = value
            .to_str()
            .unwrap_or_default()
            .trim_start_matches("Bearer ")
            .to_string();
        if let Ok(mut seen) = state.bearer_tokens_seen.try_lock() {
            seen.push(token);
        }
    }
}

async fn handle_metadata(
    State(state): State<SheetsServerState>,
    Path(sheet_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    record_bearer(&headers, &state);
    if *state.deny_access.lock().await {
        return Err(StatusCode::FORBIDDEN);
    }
    if sheet_id != KNOWN_SHEET {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "sheets": [
            { "properties": { "title": "Tab One" } },
            { "properties": { "title": "Submissions" } },
        ]
    })))
}

async fn handle_values(
    State(state): State<SheetsServerState>,
    Path((sheet_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    record_bearer(&headers, &state);
    if sheet_id != KNOWN_SHEET {
        return Err(StatusCode::NOT_FOUND);
    }
    let grid = state.grid.lock().await.clone();
    Ok(Json(json!({ "range": range, "values": grid })))
}

async fn handle_append(
    State(state): State<SheetsServerState>,
    Path((sheet_id, range)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    record_bearer(&headers, &state);
    if sheet_id != KNOWN_SHEET {
        return Err(StatusCode::NOT_FOUND);
    }
    if *state.deny_access.lock().await {
        return Err(StatusCode::FORBIDDEN);
    }
    assert!(range.ends_with(":append"), "unexpected range: {range}");

    let values = payload["values"][0]
        .as_array()
        .expect("values array")
        .iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    state.appended.lock().await.push(values);
    Ok(Json(json!({ "updates": { "updatedRows": 1 } })))
}

async fn spawn_sheets_server(grid: Vec<Vec<String>>) -> (HttpSheetsGateway, SheetsServerState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = SheetsServerState {
        grid: Arc::new(Mutex::new(grid)),
        appended: Arc::new(Mutex::new(Vec::new())),
        deny_access: Arc::new(Mutex::new(false)),
        bearer_tokens_seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v4/spreadsheets/:id", get(handle_metadata))
        .route(
            "/v4/spreadsheets/:id/values/:range",
            get(handle_values).post(handle_append),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let gateway = HttpSheetsGateway::with_http_client(
        no_proxy_client(),
        Arc::new(StaticTokenSource("test-token".to_string())),
        format!("http://{addr}"),
    );
    (gateway, state)
}

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

#[tokio::test]
async fn lists_worksheet_titles_in_sheet_order() {
    let (gateway, _state) = spawn_sheets_server(Vec::new()).await;

    let titles = gateway
        .list_worksheets(&SheetId::new(KNOWN_SHEET))
        .await
        .expect("list");
    assert_eq!(
        titles,
        vec![
            WorksheetName::new("Tab One"),
            WorksheetName::new("Submissions")
        ]
    );
}

#[tokio::test]
async fn unknown_sheet_id_is_reported_as_not_found() {
    let (gateway, _state) = spawn_sheets_server(Vec::new()).await;

    let err = gateway
        .list_worksheets(&SheetId::new("missing-sheet"))
        .await
        .expect_err("must fail");
    match err {
        GatewayError::SpreadsheetNotFound { sheet_id } => assert_eq!(sheet_id, "missing-sheet"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn denied_access_is_reported_as_permission_error() {
    let (gateway, state) = spawn_sheets_server(Vec::new()).await;
    *state.deny_access.lock().await = true;

    let err = gateway
        .list_worksheets(&SheetId::new(KNOWN_SHEET))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::Permission(_)), "{err:?}");
}

#[tokio::test]
async fn reads_records_with_header_row_as_columns() {
    let (gateway, _state) = spawn_sheets_server(grid(&[
        &["Title", "Video URL", "Category"],
        &["First", "https://example.com/1.mp4", "Demo"],
        &["Second", "https://example.com/2.mp4"],
    ]))
    .await;

    let rows = gateway
        .read_all_records(&SheetId::new(KNOWN_SHEET), &WorksheetName::new("Tab One"))
        .await
        .expect("read");

    assert_eq!(rows.columns, vec!["Title", "Video URL", "Category"]);
    assert_eq!(rows.len(), 2);
    // Short trailing rows are padded to the header width.
    assert_eq!(rows.value(&rows.rows[1], "Category"), Some(""));
    assert_eq!(
        rows.value(&rows.rows[0], "Video URL"),
        Some("https://example.com/1.mp4")
    );
}

#[tokio::test]
async fn empty_worksheet_reads_as_an_empty_row_set() {
    let (gateway, _state) = spawn_sheets_server(Vec::new()).await;

    let rows = gateway
        .read_all_records(&SheetId::new(KNOWN_SHEET), &WorksheetName::new("Tab One"))
        .await
        .expect("read");
    assert!(rows.is_empty());
    assert!(rows.columns.is_empty());
}

#[tokio::test]
async fn missing_worksheet_is_resolved_before_fetching_values() {
    let (gateway, _state) =
        spawn_sheets_server(grid(&[&["Title"], &["should never be fetched"]])).await;

    let err = gateway
        .read_all_records(&SheetId::new(KNOWN_SHEET), &WorksheetName::new("Nope"))
        .await
        .expect_err("must fail");
    match err {
        GatewayError::WorksheetNotFound { worksheet } => assert_eq!(worksheet, "Nope"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn append_posts_the_row_with_the_bearer_token() {
    let (gateway, state) = spawn_sheets_server(Vec::new()).await;

    gateway
        .append_row(
            &SheetId::new(KNOWN_SHEET),
            &WorksheetName::new("Submissions"),
            &[
                "Demo".to_string(),
                "https://example.com/v.mp4".to_string(),
                String::new(),
            ],
        )
        .await
        .expect("append");

    let appended = state.appended.lock().await.clone();
    assert_eq!(
        appended,
        vec![vec![
            "Demo".to_string(),
            "https://example.com/v.mp4".to_string(),
            String::new(),
        ]]
    );
    assert!(state
        .bearer_tokens_seen
        .lock()
        .await
        .iter()
        .all(|token| token == "test-token"));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Port 9 is discard; nothing listens there in the test environment.
    let gateway = HttpSheetsGateway::with_http_client(
        no_proxy_client(),
        Arc::new(StaticTokenSource("test-token".to_string())),
        "http://127.0.0.1:9",
    );

    let err = gateway
        .list_worksheets(&SheetId::new(KNOWN_SHEET))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
}

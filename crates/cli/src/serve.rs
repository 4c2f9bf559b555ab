//! HTTP surface: the Source Ledger webhook and a manual sync endpoint.
//!
//! The pipeline underneath is blocking (vendor clients, SQLite), so
//! every handler hops to `spawn_blocking` and serializes pipeline runs
//! behind the state mutexes. Throughput is a non-issue at gym scale;
//! correctness of the ledger claim is what matters.

use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use boletera_bsale::BsaleClient;
use boletera_config::Settings;
use boletera_evo::EvoClient;
use boletera_ledger::SqliteLedger;
use boletera_recon::{
    Orchestrator, PollReport, RunMode, SaleOutcome, SyncError, VariantMap,
};

use crate::EXIT_SUCCESS;

const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

struct AppState {
    settings: Settings,
    evo: EvoClient,
    bsale: BsaleClient,
    ledger: Mutex<SqliteLedger>,
    variants: Mutex<VariantMap>,
}

pub fn run(settings: Settings) -> Result<u8, SyncError> {
    let evo = EvoClient::new(
        &settings.evo_base_v1,
        &settings.evo_base_v2,
        &settings.evo_user,
        &settings.evo_pass,
    )?;
    let bsale = BsaleClient::new(&settings.bsale_base, &settings.bsale_token)?;
    let ledger = SqliteLedger::open(&settings.ledger_path)?;
    let variants = VariantMap::load(&settings.variant_map_path, settings.sync.generic_variant_id)?;

    let listen = settings.listen_addr.clone();
    let state = Arc::new(AppState {
        settings,
        evo,
        bsale,
        ledger: Mutex::new(ledger),
        variants: Mutex::new(variants),
    });
    let app = router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| SyncError::Config(format!("tokio runtime: {e}")))?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&listen)
            .await
            .map_err(|e| SyncError::Config(format!("bind {listen}: {e}")))?;
        info!(addr = %listen, "listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| SyncError::Transport(format!("server: {e}")))
    })?;
    Ok(EXIT_SUCCESS)
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sincronizar", get(sincronizar))
        .route("/evo-webhook", post(webhook))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct SincronizarQuery {
    modo: Option<String>,
}

async fn sincronizar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SincronizarQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    // Anything but an explicit "prod" simulates.
    let mode = match query.modo.as_deref() {
        Some("prod") => RunMode::Prod,
        _ => RunMode::Test,
    };
    let report = tokio::task::spawn_blocking(move || run_poll(&state, mode))
        .await
        .map_err(|e| internal(format!("sync task: {e}")))?
        .map_err(|e| internal(e.to_string()))?;
    Ok(Html(render_report(&report)))
}

fn run_poll(state: &AppState, mode: RunMode) -> Result<PollReport, SyncError> {
    let mut ledger = state.ledger.lock().unwrap_or_else(PoisonError::into_inner);
    let mut variants = state.variants.lock().unwrap_or_else(PoisonError::into_inner);
    Orchestrator::new(
        &state.evo,
        &state.bsale,
        &mut *ledger,
        &mut *variants,
        &state.settings.sync,
    )
    .run_poll(mode)
}

/// Source Ledger webhook payload. Fields beyond these are ignored.
#[derive(Deserialize)]
struct WebhookEvent {
    #[serde(rename = "EventType")]
    event_type: Option<String>,
    #[serde(rename = "IdRecord")]
    id_record: Option<i64>,
    #[serde(rename = "IdBranch")]
    id_branch: Option<i64>,
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.settings.webhook_secret {
        warn!("webhook rejected: bad or missing secret");
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Unauthorized" })),
        );
    }

    if event.event_type.as_deref() != Some("NewSale") {
        return (StatusCode::OK, Json(serde_json::json!({ "status": "ignored" })));
    }
    let (Some(id_record), Some(id_branch)) = (event.id_record, event.id_branch) else {
        return error_json(StatusCode::BAD_REQUEST, "missing IdRecord/IdBranch");
    };

    let result = tokio::task::spawn_blocking(move || {
        let mut ledger = state.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let mut variants = state.variants.lock().unwrap_or_else(PoisonError::into_inner);
        Orchestrator::new(
            &state.evo,
            &state.bsale,
            &mut *ledger,
            &mut *variants,
            &state.settings.sync,
        )
        .process_webhook_sale(id_record, id_branch)
    })
    .await;

    match result {
        Ok(Ok(outcome)) => outcome_response(&outcome),
        Ok(Err(e)) => error_json(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, &format!("webhook task: {e}")),
    }
}

fn outcome_response(outcome: &SaleOutcome) -> (StatusCode, Json<serde_json::Value>) {
    let (code, body) = match outcome {
        SaleOutcome::Emitted(id) => (
            StatusCode::OK,
            serde_json::json!({ "status": "success", "boleta_id": id }),
        ),
        SaleOutcome::Simulated => (StatusCode::OK, serde_json::json!({ "status": "simulated" })),
        SaleOutcome::Duplicated => (StatusCode::OK, serde_json::json!({ "status": "duplicated" })),
        SaleOutcome::Paused => (StatusCode::OK, serde_json::json!({ "status": "paused" })),
        SaleOutcome::Failed(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "status": "error", "message": detail }),
        ),
    };
    (code, Json(body))
}

fn error_json(code: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (code, Json(serde_json::json!({ "status": "error", "message": message })))
}

fn internal(detail: String) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, detail)
}

fn render_report(report: &PollReport) -> String {
    let mut html = format!(
        "<html><body><h1>Sincronización {} ({})</h1>\
         <p>{} emitidos, {} simulados, {} duplicados, {} fallidos</p>",
        report.day,
        report.mode.as_str(),
        report.emitted(),
        report.simulated(),
        report.duplicated(),
        report.failed()
    );
    for branch in &report.branches {
        match &branch.error {
            Some(e) => {
                html.push_str(&format!("<h2>Sucursal {}</h2><p>Error: {e}</p>", branch.branch))
            }
            None => html.push_str(&format!(
                "<h2>Sucursal {}</h2><p>{} ventas, {} fuera de fecha</p>",
                branch.branch, branch.fetched, branch.filtered
            )),
        }
        if !branch.sales.is_empty() {
            html.push_str("<ul>");
            for sale in &branch.sales {
                html.push_str(&format!("<li>{}: {}</li>", sale.sale_key, outcome_label(&sale.outcome)));
            }
            html.push_str("</ul>");
        }
    }
    html.push_str("</body></html>");
    html
}

fn outcome_label(outcome: &SaleOutcome) -> String {
    match outcome {
        SaleOutcome::Emitted(id) => format!("emitido (doc {id})"),
        SaleOutcome::Simulated => "simulado".to_string(),
        SaleOutcome::Duplicated => "duplicado".to_string(),
        SaleOutcome::Paused => "pausado".to_string(),
        SaleOutcome::Failed(detail) => format!("fallido: {detail}"),
    }
}

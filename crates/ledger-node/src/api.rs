use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use ledger_core::{Block, CheckRequest, LedgerError, Transaction};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::actor::{Head, LedgerEvent, LedgerHandle, NodeError};

#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerHandle,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Client transfer request. Missing addresses decode as empty strings so they
/// are rejected by the ledger as invalid input rather than by the decoder.
/// Clients cannot mint: a transfer always names its sender.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxIn {
    #[serde(default, alias = "from")]
    from_address: String,
    #[serde(default, alias = "to")]
    to_address: String,
    amount: u128,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckIn {
    #[serde(default, alias = "from")]
    from_address: String,
    #[serde(default, alias = "candidate")]
    candidate_hash: String,
}

#[derive(Serialize)]
struct Accepted<T> {
    accepted: bool,
    entry: T,
}

#[derive(Serialize)]
struct Balance {
    address: String,
    balance: i128,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<u64>,
}

/// `Json` extractor whose rejections carry the same `{error}` body as every
/// other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct JsonBody<T>(T);

pub enum ApiError {
    Node(NodeError),
    Body(JsonRejection),
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Body(rejection) => (rejection.status(), rejection.body_text()),
            Self::Node(e) => {
                let status = match &e {
                    NodeError::Ledger(LedgerError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
                    NodeError::Ledger(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
                    NodeError::ActorStopped => StatusCode::SERVICE_UNAVAILABLE,
                    NodeError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    warn!(error = %e, "request failed");
                }
                (status, e.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/chain/head", get(head))
        .route("/chain/valid", get(validity))
        .route("/blocks/{index}", get(block))
        .route("/balance/{address}", get(balance))
        .route("/tx", post(submit_tx))
        .route("/check", post(submit_check))
        .route("/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until `signal` resolves. The ledger actor is then stopped,
/// which ends open `/events` streams so the server can drain its connections.
pub async fn serve<F>(listener: TcpListener, ledger: LedgerHandle, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(AppState {
        ledger: ledger.clone(),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            info!("shutdown requested");
            ledger.shutdown().await;
        })
        .await
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn head(State(state): State<AppState>) -> ApiResult<Head> {
    Ok(Json(state.ledger.head().await?))
}

async fn validity(State(state): State<AppState>) -> ApiResult<Validity> {
    let fault = state.ledger.validate().await?;
    Ok(Json(Validity {
        valid: fault.is_none(),
        index: fault.as_ref().map(|f| f.index()),
        fault: fault.map(|f| f.to_string()),
    }))
}

async fn block(State(state): State<AppState>, Path(index): Path<u64>) -> ApiResult<Block> {
    Ok(Json(state.ledger.block(index).await?))
}

async fn balance(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<Balance> {
    let balance = state.ledger.balance_of(&address).await?;
    Ok(Json(Balance { address, balance }))
}

async fn submit_tx(
    State(state): State<AppState>,
    JsonBody(tx): JsonBody<TxIn>,
) -> Result<(StatusCode, Json<Accepted<Transaction>>), ApiError> {
    let tx = Transaction::transfer(tx.from_address, tx.to_address, tx.amount);
    state.ledger.submit(tx.clone()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            accepted: true,
            entry: tx,
        }),
    ))
}

async fn submit_check(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CheckIn>,
) -> Result<(StatusCode, Json<Accepted<CheckRequest>>), ApiError> {
    let request = CheckRequest::new(req.from_address, req.candidate_hash);
    state.ledger.submit_check_request(request.clone()).await?;
    state.ledger.publish(LedgerEvent::CheckRequest(request.clone()));
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            accepted: true,
            entry: request,
        }),
    ))
}

fn sse_event(event: &LedgerEvent) -> Event {
    let built = match event {
        LedgerEvent::Block(block) => Event::default()
            .event("block")
            .id(block.index.to_string())
            .json_data(block),
        LedgerEvent::CheckRequest(request) => Event::default().event("check_request").json_data(request),
    };
    built.unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Server-sent `block` events for newly mined blocks and `check_request`
/// events for accepted check requests. The stream ends when the ledger stops.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.ledger.subscribe();
    let stream = stream::unfold((rx, state.ledger), |(mut rx, ledger)| async move {
        loop {
            let next = tokio::select! {
                next = rx.recv() => next,
                _ = ledger.stopped() => return None,
            };
            match next {
                Ok(event) => return Some((Ok(sse_event(&event)), (rx, ledger))),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

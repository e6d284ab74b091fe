use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::error::{ErrorInfo, SortError};
use crate::sorter::{FileSorter, SortOptions, TransferResult};

#[derive(Clone)]
pub struct AppState {
    pub sorter: Arc<FileSorter>,
}

impl AppState {
    pub fn new(sorter: FileSorter) -> Self {
        Self {
            sorter: Arc::new(sorter),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sort", post(sort))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Per-record outcome in the `/sort` response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordReport {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TransferResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SortResponse {
    pub records: Vec<RecordReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// 400 for bodies that are not S3 notifications, 422 for data problems,
/// 502 when storage failed; the worst record decides.
fn status_for(err: &SortError) -> StatusCode {
    match err {
        SortError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn sort(
    State(state): State<AppState>,
    Query(options): Query<SortOptions>,
    body: String,
) -> (StatusCode, Json<SortResponse>) {
    let outcomes = match state.sorter.sort_event(&body, &options).await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SortResponse {
                    records: Vec::new(),
                    error: Some(ErrorInfo::from(&err)),
                }),
            )
        }
    };

    let mut status = StatusCode::OK;
    let mut records = Vec::with_capacity(outcomes.len());
    for (source, outcome) in outcomes {
        match outcome {
            Ok(result) => records.push(RecordReport {
                key: source.key,
                result: Some(result),
                error: None,
            }),
            Err(err) => {
                let s = status_for(&err);
                if s.as_u16() > status.as_u16() {
                    status = s;
                }
                records.push(RecordReport {
                    key: source.key,
                    result: None,
                    error: Some(ErrorInfo::from(&err)),
                });
            }
        }
    }

    (status, Json(SortResponse { records, error: None }))
}

//! Sales and purchase document routes.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_core::posting::{
    CreatePostingInput, DocumentKind, RawLineInput, UpdatePostingInput,
};
use stockbook_core::projection::{ListFilter, Projection, Row, TransactionView};
use stockbook_shared::types::{CounterpartyId, TransactionId};
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/rows", get(list_rows))
        .route(
            "/transactions/{document_number}",
            get(get_transaction).put(update_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Comma-separated document types; all types when absent.
    #[serde(rename = "type")]
    pub types: Option<String>,
    /// Inclusive start date (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
}

impl ListTransactionsQuery {
    /// Converts the query into a list filter.
    ///
    /// # Errors
    ///
    /// Returns a bad request if a type is unknown or the range is inverted.
    pub fn into_filter(self) -> Result<ListFilter, ApiError> {
        let mut kinds = BTreeSet::new();
        for name in self.types.iter().flat_map(|t| t.split(',')) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let kind = name
                .parse::<DocumentKind>()
                .map_err(|message| ApiError::bad_request("INVALID_TYPE", message))?;
            kinds.insert(kind);
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ApiError::bad_request(
                    "INVALID_DATE_RANGE",
                    format!("Start date {from} is after end date {to}"),
                ));
            }
        }

        Ok(ListFilter {
            kinds,
            date_from: self.from,
            date_to: self.to,
        })
    }
}

/// Query parameters for the flattened list view.
#[derive(Debug, Default, Deserialize)]
pub struct ListRowsQuery {
    /// Comma-separated document types; all types when absent.
    #[serde(rename = "type")]
    pub types: Option<String>,
    /// Inclusive start date (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Comma-separated document numbers whose lines are shown.
    pub expand: Option<String>,
}

impl ListRowsQuery {
    fn expanded(&self) -> BTreeSet<String> {
        self.expand
            .iter()
            .flat_map(|e| e.split(','))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Document type.
    #[serde(rename = "type")]
    pub transaction_type: DocumentKind,
    /// Document date (YYYY-MM-DD).
    pub transaction_date: NaiveDate,
    /// Customer or supplier.
    pub counterparty_id: Option<CounterpartyId>,
    /// Product rows.
    #[serde(default)]
    pub lines: Vec<RawLineInput>,
    /// Optional remark.
    pub remark: Option<String>,
}

/// Request body for editing a transaction.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    /// Document date (YYYY-MM-DD).
    pub transaction_date: NaiveDate,
    /// Customer or supplier.
    pub counterparty_id: Option<CounterpartyId>,
    /// Product rows; they replace every existing line.
    #[serde(default)]
    pub lines: Vec<RawLineInput>,
    /// A new document number, if the user edited it.
    pub document_number: Option<String>,
    /// Optional remark.
    pub remark: Option<String>,
}

/// Response for a created transaction.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    /// Internal id.
    pub id: TransactionId,
    /// Allocated document number.
    pub document_number: String,
    /// Document type.
    #[serde(rename = "type")]
    pub transaction_type: DocumentKind,
    /// Document date.
    pub transaction_date: NaiveDate,
    /// Total debits.
    pub total_debit: Decimal,
    /// Total credits.
    pub total_credit: Decimal,
    /// Number of lines, balancing line included.
    pub line_count: usize,
}

/// Flattened list view in display order.
#[derive(Debug, Serialize)]
pub struct RowsResponse<'a> {
    /// Document rows, each followed by its lines when expanded.
    pub rows: Vec<Row<'a>>,
    /// Sum of document amounts.
    pub total_amount: Decimal,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /transactions - list documents as a parent/child row tree.
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Arc<Projection>>, ApiError> {
    let projection = load_projection(&state, query.into_filter()?).await?;
    Ok(Json(projection))
}

/// GET /transactions/rows - list documents as display rows.
async fn list_rows(
    State(state): State<AppState>,
    Query(query): Query<ListRowsQuery>,
) -> Result<Response, ApiError> {
    let expanded = query.expanded();
    let filter = ListTransactionsQuery {
        types: query.types,
        from: query.from,
        to: query.to,
    }
    .into_filter()?;

    let projection = load_projection(&state, filter).await?;
    let response = RowsResponse {
        rows: projection.visible_rows(&expanded),
        total_amount: projection.total_amount,
    };

    Ok(Json(response).into_response())
}

async fn load_projection(
    state: &AppState,
    filter: ListFilter,
) -> Result<Arc<Projection>, ApiError> {
    if let Some(cached) = state.cache.list(&filter) {
        debug!(documents = cached.document_count(), "Serving cached projection");
        return Ok(cached);
    }

    let ticket = state.cache.list_ticket(&filter);
    let projection = state.transactions().list_projection(&filter).await?;
    Ok(state.cache.put_list(filter, projection, ticket))
}

/// POST /transactions - create a document.
async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreatePostingInput {
        kind: payload.transaction_type,
        date: payload.transaction_date,
        counterparty_id: payload.counterparty_id,
        lines: payload.lines,
        remark: payload.remark,
    };

    let created = state.transactions().create_transaction(input).await?;

    let response = CreatedResponse {
        id: created.id,
        document_number: created.document_number,
        transaction_type: created.kind,
        transaction_date: created.date,
        total_debit: created.totals.debit,
        total_credit: created.totals.credit,
        line_count: created.line_count,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /transactions/{document_number} - read a document for editing.
async fn get_transaction(
    State(state): State<AppState>,
    Path(document_number): Path<String>,
) -> Result<Json<Arc<TransactionView>>, ApiError> {
    if let Some(cached) = state.cache.detail(&document_number) {
        return Ok(Json(cached));
    }

    let ticket = state.cache.detail_ticket();
    let view = state.transactions().get_transaction(&document_number).await?;
    Ok(Json(state.cache.put_detail(view, ticket)))
}

/// PUT /transactions/{document_number} - replace a document's posting.
async fn update_transaction(
    State(state): State<AppState>,
    Path(document_number): Path<String>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Json<TransactionView>, ApiError> {
    let repo = state.transactions();

    let input = UpdatePostingInput {
        document_number,
        date: payload.transaction_date,
        counterparty_id: payload.counterparty_id,
        lines: payload.lines,
        new_document_number: payload.document_number,
        remark: payload.remark,
    };

    let current_number = repo.update_transaction(input).await?;
    let view = repo.get_transaction(&current_number).await?;

    Ok(Json(view))
}

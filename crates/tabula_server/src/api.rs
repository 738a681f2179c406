//! HTTP API for datasets, tables, rows and exports.

use crate::error::ApiError;
use crate::params::{QueryMap, data_options, export_options, list_query};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tabula_core::{
    BulkRequest, ExportFormat, ExportRequest, InsertRequest, RowUpdateRequest, rows_to_csv,
};
use tabula_error::InputError;
use tabula_warehouse::TableService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument};

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    /// Table operations.
    pub service: Arc<TableService>,
}

impl ApiState {
    /// Creates a new API state.
    pub fn new(service: Arc<TableService>) -> Self {
        Self { service }
    }
}

/// Creates the API router.
pub fn create_router(service: TableService) -> Router {
    let state = ApiState::new(Arc::new(service));
    let table = "/api/datasets/:dataset_id/tables/:table_id";

    Router::new()
        .route("/health", get(health_check))
        .route("/api/datasets", get(list_datasets))
        .route("/api/datasets/:dataset_id/tables", get(list_tables))
        .route(table, get(table_details))
        .route(&format!("{}/data", table), get(table_data))
        .route(&format!("{}/rows", table), post(insert_rows))
        .route(
            &format!("{}/rows/:row_id", table),
            put(update_row).delete(delete_row),
        )
        .route(&format!("{}/bulk", table), put(bulk))
        .route(
            &format!("{}/export", table),
            post(start_export).get(download_export),
        )
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn echo(path: Value, query: &QueryMap) -> Value {
    match path {
        Value::Object(mut map) => {
            if !query.is_empty() {
                map.insert("query".to_string(), json!(query));
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, InputError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| InputError::malformed("body", rejection.body_text()))
}

/// Like [`body`], but a request without a JSON body takes the defaults.
fn optional_body<T: Default>(payload: Result<Json<T>, JsonRejection>) -> Result<T, InputError> {
    match payload {
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        other => body(other),
    }
}

/// Liveness check; never touches the warehouse.
#[instrument(skip_all)]
async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "timestamp": Utc::now().to_rfc3339(),
            "backend": state.service.backend().name(),
        })),
    )
}

#[instrument(skip_all)]
async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found", "path": uri.path() })),
    )
}

#[instrument(skip(state))]
async fn list_datasets(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let datasets = state.service.list_datasets().await?;
    Ok((StatusCode::OK, Json(datasets)))
}

#[instrument(skip(state))]
async fn list_tables(
    State(state): State<ApiState>,
    Path(dataset_id): Path<String>,
    Query(params): Query<QueryMap>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || echo(json!({ "datasetId": dataset_id }), &params);
    let query = list_query(&params).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let tables = state
        .service
        .list_tables(&dataset_id, &query)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    Ok((StatusCode::OK, Json(tables)))
}

#[instrument(skip(state))]
async fn table_details(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let details = state
        .service
        .table_details(&dataset_id, &table_id)
        .await
        .map_err(|e| {
            ApiError::new(e).with_parameters(json!({ "datasetId": dataset_id, "tableId": table_id }))
        })?;
    Ok((StatusCode::OK, Json(details)))
}

#[instrument(skip(state, params), fields(filters = params.contains_key("filters")))]
async fn table_data(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
    Query(params): Query<QueryMap>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || echo(json!({ "datasetId": dataset_id, "tableId": table_id }), &params);
    let options = data_options(&params).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let page = state
        .service
        .table_data(&dataset_id, &table_id, options)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    debug!(rows = *page.total_rows(), "Table data served");
    Ok((StatusCode::OK, Json(page)))
}

#[instrument(skip(state, payload))]
async fn insert_rows(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || json!({ "datasetId": dataset_id, "tableId": table_id });
    let request = body(payload).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let outcome = state
        .service
        .insert_rows(&dataset_id, &table_id, request)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    Ok((StatusCode::OK, Json(outcome)))
}

#[instrument(skip(state, payload))]
async fn update_row(
    State(state): State<ApiState>,
    Path((dataset_id, table_id, row_id)): Path<(String, String, String)>,
    payload: Result<Json<RowUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || json!({ "datasetId": dataset_id, "tableId": table_id, "rowId": row_id });
    let request = body(payload).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let response = state
        .service
        .update_row(&dataset_id, &table_id, &row_id, request)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    Ok((StatusCode::OK, Json(response)))
}

#[instrument(skip(state))]
async fn delete_row(
    State(state): State<ApiState>,
    Path((dataset_id, table_id, row_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .service
        .delete_row(&dataset_id, &table_id, &row_id)
        .await
        .map_err(|e| {
            ApiError::new(e).with_parameters(
                json!({ "datasetId": dataset_id, "tableId": table_id, "rowId": row_id }),
            )
        })?;
    Ok((StatusCode::OK, Json(outcome)))
}

#[instrument(skip(state, payload))]
async fn bulk(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || json!({ "datasetId": dataset_id, "tableId": table_id });
    let request = body(payload).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let response = state
        .service
        .bulk(&dataset_id, &table_id, request)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    Ok((StatusCode::OK, Json(response)))
}

#[instrument(skip(state, payload))]
async fn start_export(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let context = || json!({ "datasetId": dataset_id, "tableId": table_id });
    let request =
        optional_body(payload).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let job = state
        .service
        .start_export(&dataset_id, &table_id, &request)
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    Ok((StatusCode::OK, Json(job)))
}

#[instrument(skip(state, params))]
async fn download_export(
    State(state): State<ApiState>,
    Path((dataset_id, table_id)): Path<(String, String)>,
    Query(params): Query<QueryMap>,
) -> Result<Response, ApiError> {
    let context = || echo(json!({ "datasetId": dataset_id, "tableId": table_id }), &params);
    let (format, options) =
        export_options(&params).map_err(|e| ApiError::new(e).with_parameters(context()))?;
    let rows = state
        .service
        .export_rows(&dataset_id, &table_id, options)
        .await
        .map_err(|e| ApiError::new(e).with_parameters(context()))?;
    debug!(rows = rows.len(), format = %format, "Export download");

    let disposition = format!("attachment; filename=\"{}.{}\"", table_id, format);
    let response = match format {
        ExportFormat::Csv => {
            let csv = rows_to_csv(&rows).map_err(|e| ApiError::new(e).with_parameters(context()))?;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        ExportFormat::Json => (
            StatusCode::OK,
            [(header::CONTENT_DISPOSITION, disposition)],
            Json(rows),
        )
            .into_response(),
    };
    Ok(response)
}

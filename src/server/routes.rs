use super::AppState;
use crate::core::country::{CountryView, ListQuery, SortMode, StatusView};
use crate::core::error::AppError;
use crate::refresh::RefreshReport;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl From<ListParams> for ListQuery {
    /// Empty filters are ignored and an unrecognised sort falls back to
    /// natural order.
    fn from(params: ListParams) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        ListQuery {
            region: non_empty(params.region),
            currency: non_empty(params.currency),
            sort: params
                .sort
                .and_then(|s| s.parse::<SortMode>().ok())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: RefreshReport,
}

pub async fn refresh_countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, AppError> {
    let report = state.refresh.run().await.map_err(|e| e.error)?;
    Ok(Json(RefreshResponse {
        message: "Refresh completed successfully",
        report,
    }))
}

pub async fn list_countries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CountryView>>, AppError> {
    let listed = state.service.list_countries(&params.into()).await?;
    Ok(Json(listed.as_ref().clone()))
}

pub async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<CountryView>, AppError> {
    Ok(Json(state.service.get_country(&name).await?))
}

pub async fn delete_country(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.service.delete_country(&name).await?;
    Ok(Json(json!({ "message": "Country deleted successfully" })))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusView>, AppError> {
    Ok(Json(state.service.status().await?))
}

pub async fn summary_image(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let bytes = state.service.summary_image().await?;
    Ok((
        [(header::CONTENT_TYPE, state.refresh.summary_content_type())],
        bytes,
    ))
}

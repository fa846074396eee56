use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use bazaar_domain::{
	item::SearchableItem,
	profile::UserSearchProfile,
	trend::{FrequentQuery, TrendingQuery},
};
use bazaar_service::{
	AutocompleteRequest, Error, ItemChangeReport, RankedPage, RecordQueryRequest,
	RecordQueryResponse, SearchRequest, SuggestionEntry, TrendingRequest,
};

const DEFAULT_FREQUENT_RESULTS: usize = 10;
const MAX_FREQUENT_RESULTS: usize = 100;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/autocomplete", post(autocomplete))
		.route("/v1/queries", post(record_query))
		.route("/v1/queries/frequent", get(frequent))
		.route("/v1/trending", get(trending))
		.route("/v1/items", put(upsert_item))
		.route("/v1/items/{item_id}", delete(remove_item))
		.route("/v1/profiles/{user_id}", put(put_profile))
		.route("/v1/users/{user_id}/history", get(history))
		.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
	pub suggestions: Vec<SuggestionEntry>,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
	pub trending: Vec<TrendingQuery>,
}

#[derive(Debug, Deserialize)]
pub struct FrequentParams {
	#[serde(default)]
	pub prefix: String,
	pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FrequentResponse {
	pub frequent: Vec<FrequentQuery>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
	pub queries: Vec<String>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<RankedPage>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn autocomplete(
	State(state): State<AppState>,
	Json(payload): Json<AutocompleteRequest>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
	let suggestions = state.service.autocomplete(payload).await?;

	Ok(Json(SuggestionsResponse { suggestions }))
}

async fn record_query(
	State(state): State<AppState>,
	Json(payload): Json<RecordQueryRequest>,
) -> Result<(StatusCode, Json<RecordQueryResponse>), ApiError> {
	let response = state.service.record_query(payload)?;

	Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn frequent(
	State(state): State<AppState>,
	Query(params): Query<FrequentParams>,
) -> Json<FrequentResponse> {
	let max_results =
		params.max_results.unwrap_or(DEFAULT_FREQUENT_RESULTS).min(MAX_FREQUENT_RESULTS);

	Json(FrequentResponse { frequent: state.service.get_frequent(&params.prefix, max_results) })
}

async fn history(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Json<HistoryResponse> {
	Json(HistoryResponse { queries: state.service.recent_queries(&user_id) })
}

async fn trending(
	State(state): State<AppState>,
	Query(params): Query<TrendingRequest>,
) -> Result<Json<TrendingResponse>, ApiError> {
	let trending = state.service.get_trending(params)?;

	Ok(Json(TrendingResponse { trending }))
}

async fn upsert_item(
	State(state): State<AppState>,
	Json(payload): Json<SearchableItem>,
) -> Result<Json<ItemChangeReport>, ApiError> {
	let report = state.upsert_item(payload).await?;

	Ok(Json(report))
}

async fn remove_item(
	State(state): State<AppState>,
	Path(item_id): Path<Uuid>,
) -> Result<Json<ItemChangeReport>, ApiError> {
	match state.remove_item(item_id).await? {
		Some(report) => Ok(Json(report)),
		None => Err(json_error(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("Item {item_id} does not exist."),
			None,
		)),
	}
}

async fn put_profile(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Json(payload): Json<UserSearchProfile>,
) -> Result<StatusCode, ApiError> {
	state.put_profile(&user_id, payload)?;

	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			other => {
				tracing::error!(error = %other, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use bazaar_api::{routes, state::AppState};
use bazaar_config::EmbeddingProviderConfig;
use bazaar_service::{BoxFuture, EmbeddingProvider, Error, Result};
use bazaar_testkit::{OLD_TOWN_CATERING, SUNSET_PHOTOGRAPHY};

struct OfflineEmbedding;
impl EmbeddingProvider for OfflineEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async { Err(offline()) })
	}

	fn embed_image<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_url: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async { Err(offline()) })
	}
}

fn offline() -> Error {
	Error::Provider { message: "offline".to_string(), transient: true }
}

async fn test_state() -> AppState {
	let state = AppState::with_embedding(bazaar_testkit::test_config(), Arc::new(OfflineEmbedding));

	state.load_catalog(bazaar_testkit::sample_items()).await.expect("Failed to load catalog.");

	state
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let request = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => request
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.expect("Failed to build request."),
		None => request.body(Body::empty()).expect("Failed to build request."),
	};
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let app = routes::router(test_state().await);
	let (status, _) = send(&app, "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn search_returns_keyword_matches_when_embeddings_are_down() {
	let app = routes::router(test_state().await);
	let (status, body) =
		send(&app, "POST", "/v1/search", Some(json!({ "query": "sunset photography" }))).await;
	let ids: Vec<&str> = body["results"]
		.as_array()
		.expect("Missing results.")
		.iter()
		.filter_map(|result| result["item_id"].as_str())
		.collect();

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "partial");
	assert!(ids.contains(&SUNSET_PHOTOGRAPHY.to_string().as_str()));
}

#[tokio::test]
async fn invalid_pagination_is_a_bad_request() {
	let app = routes::router(test_state().await);
	let (status, body) = send(
		&app,
		"POST",
		"/v1/search",
		Some(json!({ "query": "venue", "pagination": { "offset": 0, "size": 0 } })),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn recorded_queries_feed_autocomplete_and_trending() {
	let state = test_state().await;
	let app = routes::router(state.clone());

	for query in ["wedding cake", "wedding cake", "wedding dj"] {
		let (status, body) = send(
			&app,
			"POST",
			"/v1/queries",
			Some(json!({ "query": query, "user_id": "u1" })),
		)
		.await;

		assert_eq!(status, StatusCode::ACCEPTED);
		assert_eq!(body["accepted"], true);
	}

	assert_eq!(state.service.drain_feedback(), 3);

	let (status, body) = send(
		&app,
		"POST",
		"/v1/autocomplete",
		Some(json!({ "partial_query": "wed", "max_results": 5 })),
	)
	.await;
	let texts: Vec<&str> = body["suggestions"]
		.as_array()
		.expect("Missing suggestions.")
		.iter()
		.filter_map(|entry| entry["text"].as_str())
		.collect();

	assert_eq!(status, StatusCode::OK);
	assert!(texts.contains(&"wedding cake"));
	assert!(texts.contains(&"wedding dj"));

	let (status, body) =
		send(&app, "GET", "/v1/trending?window_hours=24&max_results=1", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["trending"][0]["query"], "wedding cake");

	let (_, body) = send(&app, "GET", "/v1/users/u1/history", None).await;

	assert_eq!(body["queries"][0], "wedding dj");
}

#[tokio::test]
async fn trending_rejects_empty_window() {
	let app = routes::router(test_state().await);
	let (status, body) = send(&app, "GET", "/v1/trending?window_hours=0", None).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn items_can_be_replaced_and_removed() {
	let app = routes::router(test_state().await);
	let mut catering = bazaar_testkit::sample_item(OLD_TOWN_CATERING).expect("Missing fixture.");

	catering.status = bazaar_domain::item::ItemStatus::Eligible;

	let (status, body) = send(
		&app,
		"PUT",
		"/v1/items",
		Some(serde_json::to_value(&catering).expect("Failed to encode item.")),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["item_id"], OLD_TOWN_CATERING.to_string());
	assert_eq!(body["embedding"], "fallback");

	let uri = format!("/v1/items/{OLD_TOWN_CATERING}");
	let (status, body) = send(&app, "DELETE", &uri, None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["embedding"], Value::Null);

	let (status, body) = send(&app, "DELETE", &uri, None).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error_code"], "not_found");
}

#[tokio::test]
async fn invalid_items_are_rejected() {
	let app = routes::router(test_state().await);
	let mut item = bazaar_testkit::sample_item(SUNSET_PHOTOGRAPHY).expect("Missing fixture.");

	item.price = bazaar_domain::item::PriceRange::new(900.0, 100.0);

	let (status, body) = send(
		&app,
		"PUT",
		"/v1/items",
		Some(serde_json::to_value(&item).expect("Failed to encode item.")),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn profiles_are_stored() {
	let state = test_state().await;
	let app = routes::router(state.clone());
	let profile = bazaar_testkit::photography_profile();
	let (status, _) = send(
		&app,
		"PUT",
		"/v1/profiles/u7",
		Some(serde_json::to_value(&profile).expect("Failed to encode profile.")),
	)
	.await;

	assert_eq!(status, StatusCode::NO_CONTENT);
	assert_eq!(state.backends.profiles.get("u7"), Some(profile));
}
